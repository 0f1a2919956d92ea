use crate::cli::{Command, LoadArgs, MatchArgs};
use crate::config::Config;
use anyhow::{bail, Context, Result};
use skillreg_skills::{
    MatchContext, MatchResult, ReasonSource, SkillDirectories, SkillError, SkillRegistry,
};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{error, info};

/// Skill service - builds the registry and runs one command against it
pub struct SkillService {
    config: Config,
}

impl SkillService {
    /// Create a new skill service
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run a single command
    pub async fn run(self, command: Command) -> Result<()> {
        // Initialize logging
        skillreg_logging::init_logging(&self.config.logging.level, self.config.logging.format)?;
        info!("Starting SkillReg");

        let registry = self.build_registry()?;

        match command {
            Command::List => print!("{}", render_list(&registry)),
            Command::Validate => {
                let errors = registry.validate();
                if !errors.is_empty() {
                    for e in &errors {
                        eprintln!("error: {e}");
                    }
                    bail!("{} structural error(s) in skill definitions", errors.len());
                }
                println!("OK: {} skill(s), no structural errors", registry.len());
            }
            Command::Match(args) => self.run_match(&registry, args).await?,
            Command::Load(args) => run_load(&registry, args).await?,
            Command::Order { id } => {
                let order = registry.dependency_order(&id)?;
                println!("{}", order.join(" -> "));
            }
        }

        Ok(())
    }

    /// Discover skills (Phase 1: load metadata only) and initialize the registry
    ///
    /// Unreadable skill folders and structural errors are printed together;
    /// either kind keeps the registry from being built.
    fn build_registry(&self) -> Result<SkillRegistry> {
        let mut directories = SkillDirectories::new();
        if self.config.skills.include_personal {
            directories = directories.with_personal_skills();
        }
        if self.config.skills.include_project {
            directories = directories.with_project_skills();
        }
        for dir in self.config.skill_directories() {
            directories = directories.add_directory(dir);
        }

        let found = directories
            .discover()
            .context("Failed to discover skills")?;
        let failures = found.failures;
        let initialized = SkillRegistry::initialize(found.skills, self.config.registry.clone());

        match initialized {
            Ok(registry) if failures.is_empty() => Ok(registry),
            outcome => {
                let errors = outcome.err().unwrap_or_default();
                eprint!("{}", render_load_errors(&failures, &errors));
                error!(
                    "Skill registry not built: {} unreadable skill(s), {} structural error(s)",
                    failures.len(),
                    errors.len()
                );
                bail!(
                    "{} unreadable skill(s), {} structural error(s) in skill definitions",
                    failures.len(),
                    errors.len()
                );
            }
        }
    }

    async fn run_match(&self, registry: &SkillRegistry, args: MatchArgs) -> Result<()> {
        let mut context = MatchContext::new();
        if let Some(file) = args.file {
            context = context.with_file(file);
        }
        if let Some(task) = args.task {
            context = context.with_task_type(task);
        }

        let results = if args.no_activate {
            registry.rank(&args.query, &context)
        } else {
            registry.find_matching_skills(&args.query, &context).await
        };

        if args.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&results).context("Failed to encode results")?
            );
        } else {
            print!("{}", render_matches(&results));
        }
        Ok(())
    }
}

async fn run_load(registry: &SkillRegistry, args: LoadArgs) -> Result<()> {
    let content = registry.ensure_level(&args.id, args.level).await?;
    println!("{content}");
    Ok(())
}

fn render_load_errors(
    failures: &[(PathBuf, anyhow::Error)],
    errors: &[SkillError],
) -> String {
    let mut out = String::new();
    for (path, e) in failures {
        let _ = writeln!(out, "error: {}: {:#}", path.display(), e);
    }
    for e in errors {
        let _ = writeln!(out, "error: {e}");
    }
    out
}

fn render_list(registry: &SkillRegistry) -> String {
    if registry.is_empty() {
        return "No skills found\n".to_string();
    }

    let mut out = String::new();
    for skill in registry.skills() {
        let _ = write!(out, "{}: {}", skill.id, skill.description);
        if !skill.depends_on.is_empty() {
            let _ = write!(out, " (depends on {})", skill.depends_on.join(", "));
        }
        out.push('\n');
    }
    out
}

fn render_matches(results: &[MatchResult]) -> String {
    if results.is_empty() {
        return "No matching skills\n".to_string();
    }

    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({:.2}) [{}]",
            rank + 1,
            result.skill_id,
            result.score,
            result.level
        );
        for reason in &result.reasons {
            let source = match reason.source {
                ReasonSource::Trigger(kind) => kind.to_string(),
                ReasonSource::Description => "description".to_string(),
            };
            let _ = writeln!(out, "   {}:{} +{:.2}", source, reason.matched, reason.weight);
        }
        for hint in &result.delegation_hints {
            let _ = writeln!(out, "   -> {} ({:.2}): {}", hint.skill_id, hint.score, hint.hint);
        }
        if let Some(e) = &result.activation_error {
            let _ = writeln!(out, "   ! {e}");
        }
    }
    out
}
