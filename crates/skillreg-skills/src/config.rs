//! Configuration types for the skill registry

use serde::Deserialize;

/// Registry tuning knobs
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RegistryConfig {
    /// Score at or above which a match is lazily upgraded to `Core`
    #[serde(default = "default_activation_threshold")]
    pub activation_threshold: f64,

    /// Score a delegation target must exceed to be hinted on the top result
    #[serde(default = "default_delegation_threshold")]
    pub delegation_threshold: f64,

    /// Cap on returned matches, applied after sorting
    #[serde(default)]
    pub max_results: Option<usize>,
}

fn default_activation_threshold() -> f64 {
    1.0
}

fn default_delegation_threshold() -> f64 {
    1.0
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            activation_threshold: default_activation_threshold(),
            delegation_threshold: default_delegation_threshold(),
            max_results: None,
        }
    }
}
