//! Skill records and triggers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Weight given to a trigger that does not declare one
pub const DEFAULT_TRIGGER_WEIGHT: f64 = 1.0;

fn default_weight() -> f64 {
    DEFAULT_TRIGGER_WEIGHT
}

/// Frontmatter-level description of a skill
///
/// This is everything the registry knows about a skill before any content
/// body is read. `depends_on` keeps declaration order (duplicates are
/// dropped by the registry); `delegates_to` maps a skill id to a short hint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillMetadata {
    /// Unique, stable skill id
    #[serde(alias = "name")]
    pub id: String,
    /// Free text, used as the scoring fallback
    pub description: String,
    /// Ordered trigger rules
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    /// Skills that must be loaded before this one executes
    #[serde(default, alias = "dependsOn")]
    pub depends_on: Vec<String>,
    /// Skills this one hands work off to, with a hint for each
    #[serde(default, alias = "delegatesTo")]
    pub delegates_to: BTreeMap<String, String>,
}

impl SkillMetadata {
    /// Create a skill with no triggers and no relations
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            triggers: Vec::new(),
            depends_on: Vec::new(),
            delegates_to: BTreeMap::new(),
        }
    }

    /// Append a trigger
    pub fn with_trigger(mut self, trigger: Trigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    /// Append a dependency
    pub fn depends_on(mut self, id: impl Into<String>) -> Self {
        self.depends_on.push(id.into());
        self
    }

    /// Add a delegation target
    pub fn delegates_to(mut self, id: impl Into<String>, hint: impl Into<String>) -> Self {
        self.delegates_to.insert(id.into(), hint.into());
        self
    }

    /// Render as a one-line catalogue entry: `- {id}: {description}`
    pub fn to_summary(&self) -> String {
        format!("- {}: {}", self.id, self.description)
    }
}

// ============================================================================
// Triggers
// ============================================================================

/// Discriminator of a [`Trigger`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Regular expression over the query text
    Pattern,
    /// Case-insensitive substring of the query text
    Keyword,
    /// Glob over the current file path
    FileGlob,
}

impl TriggerKind {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Pattern => "pattern",
            TriggerKind::Keyword => "keyword",
            TriggerKind::FileGlob => "file_glob",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A weighted rule scored against a query and its context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    /// Regex source, evaluated against the query text
    Pattern {
        /// Regex source
        value: String,
        /// Score contribution when fired
        #[serde(default = "default_weight")]
        weight: f64,
    },
    /// Plain word or phrase, evaluated against the query text
    Keyword {
        /// Keyword text
        value: String,
        /// Score contribution when fired
        #[serde(default = "default_weight")]
        weight: f64,
    },
    /// Glob, evaluated against the current file path
    #[serde(alias = "fileGlob")]
    FileGlob {
        /// Glob source
        value: String,
        /// Score contribution when fired
        #[serde(default = "default_weight")]
        weight: f64,
    },
}

impl Trigger {
    /// Regex trigger
    pub fn pattern(value: impl Into<String>, weight: f64) -> Self {
        Trigger::Pattern {
            value: value.into(),
            weight,
        }
    }

    /// Keyword trigger
    pub fn keyword(value: impl Into<String>, weight: f64) -> Self {
        Trigger::Keyword {
            value: value.into(),
            weight,
        }
    }

    /// File glob trigger
    pub fn file_glob(value: impl Into<String>, weight: f64) -> Self {
        Trigger::FileGlob {
            value: value.into(),
            weight,
        }
    }

    /// Kind discriminator
    pub fn kind(&self) -> TriggerKind {
        match self {
            Trigger::Pattern { .. } => TriggerKind::Pattern,
            Trigger::Keyword { .. } => TriggerKind::Keyword,
            Trigger::FileGlob { .. } => TriggerKind::FileGlob,
        }
    }

    /// Source text of the rule
    pub fn value(&self) -> &str {
        match self {
            Trigger::Pattern { value, .. }
            | Trigger::Keyword { value, .. }
            | Trigger::FileGlob { value, .. } => value,
        }
    }

    /// Score contribution when the trigger fires
    pub fn weight(&self) -> f64 {
        match self {
            Trigger::Pattern { weight, .. }
            | Trigger::Keyword { weight, .. }
            | Trigger::FileGlob { weight, .. } => *weight,
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_yaml_with_default_weight() {
        let yaml = r#"
- kind: keyword
  value: migration
  weight: 10
- kind: pattern
  value: "migrat(e|ion)"
- kind: fileGlob
  value: "**/*.sql"
"#;
        let triggers: Vec<Trigger> = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(triggers[0], Trigger::keyword("migration", 10.0));
        assert_eq!(triggers[1].weight(), DEFAULT_TRIGGER_WEIGHT);
        assert_eq!(triggers[2].kind(), TriggerKind::FileGlob);
        assert_eq!(triggers[2].to_string(), "file_glob:**/*.sql");
    }

    #[test]
    fn test_metadata_accepts_name_alias() {
        let yaml = r#"
name: go-migration
description: Database migrations for Go services
depends_on: [go-config]
delegates_to:
  go-config: read connection settings first
"#;
        let skill: SkillMetadata = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(skill.id, "go-migration");
        assert!(skill.triggers.is_empty());
        assert_eq!(skill.depends_on, vec!["go-config".to_string()]);
        assert_eq!(
            skill.delegates_to.get("go-config").map(String::as_str),
            Some("read connection settings first")
        );
    }

    #[test]
    fn test_summary_line() {
        let skill = SkillMetadata::new("code-reviewer", "Reviews code");
        assert_eq!(skill.to_summary(), "- code-reviewer: Reviews code");
    }
}
