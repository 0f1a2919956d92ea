//! Error types for registry operations

use skillreg_types::DisclosureLevel;
use std::fmt;
use thiserror::Error;

/// Relation through which one skill references another
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    /// `depends_on` edge
    DependsOn,
    /// `delegates_to` edge
    DelegatesTo,
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relation::DependsOn => f.write_str("depends_on"),
            Relation::DelegatesTo => f.write_str("delegates_to"),
        }
    }
}

/// Skill registry errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SkillError {
    /// Trigger that cannot be compiled or carries an unusable weight
    #[error("Invalid trigger '{trigger}' on skill '{skill_id}': {reason}")]
    InvalidTrigger {
        /// Skill declaring the trigger
        skill_id: String,
        /// Trigger as `kind:value`
        trigger: String,
        /// Compiler or validation message
        reason: String,
    },

    /// Two records share an id
    #[error("Skill '{skill_id}' is defined more than once")]
    DuplicateSkill {
        /// Repeated id
        skill_id: String,
    },

    /// Reference to a skill that is not registered
    #[error("Skill '{skill_id}' references unknown skill '{missing_id}' via {relation}")]
    MissingDependency {
        /// Referencing skill
        skill_id: String,
        /// Id that does not exist
        missing_id: String,
        /// Which relation holds the reference
        relation: Relation,
    },

    /// Cycle over `depends_on` edges
    #[error("Circular dependency: {}", path.join(" -> "))]
    CircularDependency {
        /// Ids from the re-visited skill back to itself
        path: Vec<String>,
    },

    /// Content source could not supply a level
    #[error("Failed to load skill '{skill_id}' to {level} level: {cause}")]
    LevelLoadFailure {
        /// Skill being upgraded
        skill_id: String,
        /// Requested level
        level: DisclosureLevel,
        /// Underlying error chain
        cause: String,
    },

    /// Lookup of an id that is not registered
    #[error("Skill '{0}' not found")]
    SkillNotFound(String),
}

impl SkillError {
    /// Whether this error blocks the registry from becoming queryable
    #[must_use]
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            SkillError::InvalidTrigger { .. }
                | SkillError::DuplicateSkill { .. }
                | SkillError::MissingDependency { .. }
                | SkillError::CircularDependency { .. }
        )
    }
}

/// Pattern or glob source rejected by its compiler
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot compile '{pattern}': {reason}")]
pub struct PatternError {
    /// Rejected source
    pub pattern: String,
    /// Compiler message
    pub reason: String,
}

/// Convenient Result type alias
pub type Result<T> = std::result::Result<T, SkillError>;
