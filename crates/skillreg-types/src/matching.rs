//! Match context and results

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::disclosure::DisclosureLevel;
use crate::skill::TriggerKind;

/// Caller-supplied context for a match. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchContext {
    /// Path of the file the caller is working on
    pub file_path: Option<String>,
    /// File extension, without the leading dot
    pub file_extension: Option<String>,
    /// Task-type label, e.g. `review` or `migration`
    pub task_type: Option<String>,
    /// Free-text query
    pub query: Option<String>,
}

impl MatchContext {
    /// Empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the current file path
    pub fn with_file(mut self, path: impl Into<String>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Set the file extension
    pub fn with_extension(mut self, ext: impl Into<String>) -> Self {
        self.file_extension = Some(ext.into().trim_start_matches('.').to_string());
        self
    }

    /// Set the task-type label
    pub fn with_task_type(mut self, task_type: impl Into<String>) -> Self {
        self.task_type = Some(task_type.into());
        self
    }

    /// Set the free-text query
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Explicit extension, or the one derived from `file_path`
    pub fn extension(&self) -> Option<String> {
        self.file_extension
            .as_deref()
            .filter(|e| !e.is_empty())
            .map(str::to_string)
            .or_else(|| {
                self.file_path
                    .as_deref()
                    .and_then(|p| Path::new(p).extension())
                    .and_then(|e| e.to_str())
                    .map(str::to_string)
            })
    }
}

/// What produced a [`MatchReason`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonSource {
    /// An explicit trigger fired
    Trigger(TriggerKind),
    /// Token overlap between the query and the skill description
    Description,
}

/// One contribution to a skill's score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReason {
    /// Trigger kind or description fallback
    pub source: ReasonSource,
    /// Trigger value, or the overlapping tokens for a fallback
    pub matched: String,
    /// Amount added to the score
    pub weight: f64,
}

/// A related skill surfaced alongside the top result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelegationHint {
    /// Delegation target
    pub skill_id: String,
    /// Hint text declared by the delegating skill
    pub hint: String,
    /// Target's own score for the same context
    pub score: f64,
}

/// A scored skill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Matched skill
    pub skill_id: String,
    /// Sum of reason weights, never negative
    pub score: f64,
    /// Contributions in trigger order
    pub reasons: Vec<MatchReason>,
    /// Only populated on the top-ranked result
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub delegation_hints: Vec<DelegationHint>,
    /// Disclosure level after the match pass
    pub level: DisclosureLevel,
    /// Set when lazy activation of this skill failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activation_error: Option<String>,
}
