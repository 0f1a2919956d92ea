//! SkillReg Types - Core types for the skill registry
//!
//! This crate defines the data shapes shared by the registry core and its
//! callers. It carries no behavior beyond construction helpers; validation
//! of trigger sources happens in `skillreg-skills` at load time.

#![deny(unsafe_code, unused_imports, unused_variables, missing_docs)]

pub mod disclosure;
pub mod matching;
pub mod skill;

pub use disclosure::DisclosureLevel;
pub use matching::{DelegationHint, MatchContext, MatchReason, MatchResult, ReasonSource};
pub use skill::{SkillMetadata, Trigger, TriggerKind, DEFAULT_TRIGGER_WEIGHT};
