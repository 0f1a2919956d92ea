use anyhow::{anyhow, Result};
use serde::Deserialize;
use skillreg_logging::LogFormat;
use skillreg_skills::RegistryConfig;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Optional workspace override, relative to the working directory
const LOCAL_CONFIG: &str = "skillreg.toml";

/// Default config template created when no config exists
const DEFAULT_CONFIG: &str = r#"
[registry]
activation_threshold = 1.0  # score at which a match loads its core content
delegation_threshold = 1.0  # score a delegate must exceed to be hinted
# max_results = 10

[skills]
directories = []  # extra skill folders, e.g. ["~/work/skills"]
include_personal = true  # ~/.skillreg/skills
include_project = true   # ./.skillreg/skills

[logging]
level = "warn"  # trace, debug, info, warn, error
format = "text"  # text or json
"#;

#[derive(Debug, Deserialize, Clone)]
pub struct SkillsConfig {
    #[serde(default)]
    pub directories: Vec<String>,
    #[serde(default = "enabled")]
    pub include_personal: bool,
    #[serde(default = "enabled")]
    pub include_project: bool,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            directories: Vec::new(),
            include_personal: true,
            include_project: true,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_level() -> String {
    "warn".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the global config path: ~/.skillreg/skillreg.toml
    fn global_config_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".skillreg").join("skillreg.toml"))
            .ok_or_else(|| anyhow!("Could not find home directory"))
    }

    /// Ensure global config directory and file exist, creating defaults if needed
    fn ensure_global_config() -> Result<PathBuf> {
        let config_path = Self::global_config_path()?;

        if let Some(config_dir) = config_path.parent() {
            if !config_dir.exists() {
                fs::create_dir_all(config_dir)?;
                eprintln!("Created config directory: {}", config_dir.display());
            }
        }

        if !config_path.exists() {
            fs::write(&config_path, DEFAULT_CONFIG.trim())?;
            eprintln!("Created default config: {}", config_path.display());
        }

        Ok(config_path)
    }

    /// Load configuration with layered approach:
    /// 1. Base config: `explicit` if given, else ~/.skillreg/skillreg.toml (auto-created if missing)
    /// 2. Local override: ./skillreg.toml (workspace, optional)
    /// 3. Environment variables with SKILLREG__ prefix
    /// 4. `SKILLREG_LOG` for the log level (highest priority)
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        // Load .env file from current directory
        dotenvy::dotenv().ok();

        let base_path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Self::ensure_global_config()?,
        };

        Self::load_layered(base_path, Path::new(LOCAL_CONFIG), env::var("SKILLREG_LOG").ok())
    }

    /// Merge base file, optional local file, environment, then the log level override
    fn load_layered(base: PathBuf, local: &Path, log_level: Option<String>) -> Result<Self> {
        let mut config_builder = config::Config::builder()
            .add_source(config::File::from(base))
            .add_source(config::File::from(local.to_path_buf()).required(false))
            .add_source(
                config::Environment::with_prefix("SKILLREG")
                    .separator("__")
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("skills.directories"),
            );

        if let Some(level) = log_level {
            config_builder = config_builder.set_override("logging.level", level)?;
        }

        let config: Self = config_builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Configured skill directories with `~` expanded, in scan order
    pub fn skill_directories(&self) -> Vec<PathBuf> {
        self.skills
            .directories
            .iter()
            .map(|dir| expand_home(dir))
            .collect()
    }
}

/// Expand a bare `~` or a leading `~/` to the home directory
///
/// `~user` forms are left as written.
fn expand_home(dir: &str) -> PathBuf {
    let rest = if dir == "~" {
        Some("")
    } else {
        dir.strip_prefix("~/").or_else(|| dir.strip_prefix("~\\"))
    };
    match (rest, dirs::home_dir()) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(dir),
    }
}
