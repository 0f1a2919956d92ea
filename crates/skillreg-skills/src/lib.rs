//! `SkillReg` Skills Registry
//!
//! Indexes a corpus of skill documents, scores them against a query and
//! its context, resolves inter-skill dependencies, and discloses skill
//! content progressively to bound token cost.
//!
//! ## Features
//!
//! - Deterministic, explainable matching: weighted pattern, keyword and
//!   file-glob triggers, with a description fallback
//! - Dependency graph with exact cycle reporting and stable load order
//! - Progressive disclosure: metadata at startup, core body on match,
//!   full content (plus dependencies) on execution
//! - Compile-once pattern cache shared across concurrent queries
//! - SKILL.md discovery across personal, project and extra directories
//!
//! ## Architecture
//!
//! Phase 1 (Discovery): load only frontmatter from each SKILL.md
//! Phase 2 (Activation): a strong match loads the core body
//! Phase 3 (Execution): the selected skill and its dependencies are loaded in order

#![deny(unsafe_code, dead_code, unused_imports, unused_variables, missing_docs)]

pub mod config;
pub mod discovery;
pub mod error;
pub mod loader;
pub mod patterns;
pub mod registry;
pub mod resolver;
pub mod scoring;
pub mod skill;

pub use config::RegistryConfig;
pub use discovery::{Discovered, SkillDirectories};
pub use error::{PatternError, Relation, Result, SkillError};
pub use loader::{ContentSource, InlineContent};
pub use patterns::{CacheStats, PatternCache};
pub use registry::{RawSkill, RejectedTrigger, SkillRegistry};
pub use resolver::DependencyGraph;
pub use skill::SkillFile;

pub use skillreg_types::{
    DelegationHint, DisclosureLevel, MatchContext, MatchReason, MatchResult, ReasonSource,
    SkillMetadata, Trigger, TriggerKind,
};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        DisclosureLevel, MatchContext, RawSkill, RegistryConfig, SkillDirectories, SkillError,
        SkillRegistry,
    };
}
