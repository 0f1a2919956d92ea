//! SKILL.md parsing and file-backed content
//!
//! Each skill is a folder containing SKILL.md with YAML frontmatter. The
//! frontmatter becomes [`SkillMetadata`]; the body after it is the `Core`
//! content, and the body followed by every `references/*.md` file is the
//! `Full` content. Bodies are re-read from disk on demand.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_yaml::Value;
use skillreg_types::{SkillMetadata, Trigger};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::loader::ContentSource;
use crate::registry::RejectedTrigger;

/// Name of the skill definition file inside a skill folder
pub const SKILL_FILE: &str = "SKILL.md";
/// Folder holding material appended at the `Full` level
pub const REFERENCES_DIR: &str = "references";

/// Maximum allowed name length
const MAX_NAME_LENGTH: usize = 64;
/// Maximum allowed description length
const MAX_DESCRIPTION_LENGTH: usize = 1024;

/// Content source backed by a skill folder on disk
#[derive(Debug, Clone)]
pub struct SkillFile {
    dir: PathBuf,
}

impl SkillFile {
    /// Read only the frontmatter of `dir/SKILL.md`
    ///
    /// Trigger entries that do not parse are returned separately instead of
    /// failing the whole skill.
    ///
    /// # Errors
    /// Returns an error if the file is missing, has no frontmatter, or the
    /// metadata fails validation
    pub fn metadata_from_dir(dir: &Path) -> Result<(SkillMetadata, Vec<RejectedTrigger>, Self)> {
        let skill_file = dir.join(SKILL_FILE);

        if !skill_file.exists() {
            return Err(anyhow!("{} not found in {:?}", SKILL_FILE, dir));
        }

        let content = fs::read_to_string(&skill_file)
            .with_context(|| format!("Failed to read {:?}", skill_file))?;

        let (metadata, rejected) = split_frontmatter(&content)
            .and_then(|(yaml, _)| parse_frontmatter(yaml))
            .with_context(|| format!("Failed to parse skill from {:?}", skill_file))?;

        validate_metadata(&metadata)?;

        Ok((
            metadata,
            rejected,
            Self {
                dir: dir.to_path_buf(),
            },
        ))
    }

    /// Skill folder
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    async fn read_body(&self) -> Result<String> {
        let skill_file = self.dir.join(SKILL_FILE);
        let content = tokio::fs::read_to_string(&skill_file)
            .await
            .with_context(|| format!("Failed to read {:?}", skill_file))?;

        let (_, body) = split_frontmatter(&content)
            .with_context(|| format!("Failed to parse skill from {:?}", skill_file))?;
        Ok(body.trim().to_string())
    }

    async fn read_references(&self) -> Result<Vec<(String, String)>> {
        let dir = self.dir.join(REFERENCES_DIR);
        if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
            return Ok(Vec::new());
        }

        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .with_context(|| format!("Failed to read directory {:?}", dir))?;

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|e| e == "md") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut references = Vec::with_capacity(paths.len());
        for path in paths {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = tokio::fs::read_to_string(&path)
                .await
                .with_context(|| format!("Failed to read {:?}", path))?;
            references.push((name, text));
        }

        debug!("Read {} reference file(s) from {:?}", references.len(), dir);
        Ok(references)
    }
}

#[async_trait]
impl ContentSource for SkillFile {
    async fn core(&self) -> Result<String> {
        self.read_body().await
    }

    async fn full(&self) -> Result<String> {
        let mut full = self.read_body().await?;
        for (name, text) in self.read_references().await? {
            full.push_str(&format!("\n\n## Reference: {}\n\n{}", name, text.trim()));
        }
        Ok(full)
    }
}

/// Frontmatter with triggers left untyped so each entry is checked on its own
#[derive(Deserialize)]
struct Frontmatter {
    #[serde(alias = "id")]
    name: String,
    description: String,
    #[serde(default)]
    triggers: Vec<Value>,
    #[serde(default, alias = "dependsOn")]
    depends_on: Vec<String>,
    #[serde(default, alias = "delegatesTo")]
    delegates_to: BTreeMap<String, String>,
}

/// Split skill content into the YAML frontmatter and the body after it
fn split_frontmatter(content: &str) -> Result<(&str, &str)> {
    let frontmatter_re = Regex::new(r"^---\s*\n([\s\S]*?)\n---\s*(?:\n([\s\S]*))?$")
        .map_err(|e| anyhow!("Failed to compile regex: {}", e))?;

    let captures = frontmatter_re
        .captures(content.trim_start())
        .ok_or_else(|| anyhow!("No valid YAML frontmatter found"))?;

    let yaml = captures
        .get(1)
        .ok_or_else(|| anyhow!("Failed to extract frontmatter"))?
        .as_str();

    let body = captures.get(2).map_or("", |m| m.as_str());

    Ok((yaml, body))
}

/// Parse frontmatter into metadata plus the trigger entries that did not parse
fn parse_frontmatter(yaml: &str) -> Result<(SkillMetadata, Vec<RejectedTrigger>)> {
    let frontmatter: Frontmatter =
        serde_yaml::from_str(yaml).with_context(|| "Failed to parse YAML frontmatter")?;

    let mut metadata = SkillMetadata::new(frontmatter.name, frontmatter.description);
    metadata.depends_on = frontmatter.depends_on;
    metadata.delegates_to = frontmatter.delegates_to;

    let mut rejected = Vec::new();
    for entry in frontmatter.triggers {
        match serde_yaml::from_value::<Trigger>(entry.clone()) {
            Ok(trigger) => metadata.triggers.push(trigger),
            Err(e) => {
                warn!("Skill '{}' has an unreadable trigger: {}", metadata.id, e);
                rejected.push(RejectedTrigger {
                    trigger: describe_trigger(&entry),
                    reason: e.to_string(),
                });
            }
        }
    }

    Ok((metadata, rejected))
}

/// Render a raw trigger entry as `kind:value`, or as inline YAML
fn describe_trigger(entry: &Value) -> String {
    let field = |key: &str| match entry.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    };
    match (field("kind"), field("value")) {
        (Some(kind), Some(value)) => format!("{kind}:{value}"),
        _ => serde_yaml::to_string(entry)
            .map(|s| s.trim().replace('\n', " "))
            .unwrap_or_default(),
    }
}

/// Validate frontmatter fields that the registry does not check itself
fn validate_metadata(metadata: &SkillMetadata) -> Result<()> {
    if metadata.id.is_empty() {
        return Err(anyhow!("Skill name cannot be empty"));
    }

    if metadata.id.len() > MAX_NAME_LENGTH {
        warn!(
            "Skill name '{}' exceeds {} characters (was {})",
            metadata.id,
            MAX_NAME_LENGTH,
            metadata.id.len()
        );
    }

    // Lowercase letters, numbers, and hyphens only
    let name_re = Regex::new(r"^[a-z0-9-]+$")
        .map_err(|e| anyhow!("Failed to compile name validation regex: {}", e))?;

    if !name_re.is_match(&metadata.id) {
        return Err(anyhow!(
            "Skill name '{}' must contain only lowercase letters, numbers, and hyphens",
            metadata.id
        ));
    }

    if metadata.description.trim().is_empty() {
        return Err(anyhow!("Skill description cannot be empty"));
    }

    if metadata.description.len() > MAX_DESCRIPTION_LENGTH {
        warn!(
            "Skill '{}' description exceeds {} characters (was {})",
            metadata.id,
            MAX_DESCRIPTION_LENGTH,
            metadata.description.len()
        );
    }

    Ok(())
}
