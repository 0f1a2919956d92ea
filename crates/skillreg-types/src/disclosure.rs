//! Progressive disclosure levels

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much of a skill has been loaded
///
/// Ordered: `Metadata < Core < Full`. A skill's level only ever increases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisclosureLevel {
    /// Frontmatter only: id, description, triggers
    Metadata,
    /// Main instruction body
    Core,
    /// Body plus reference material
    Full,
}

impl DisclosureLevel {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            DisclosureLevel::Metadata => "metadata",
            DisclosureLevel::Core => "core",
            DisclosureLevel::Full => "full",
        }
    }
}

impl fmt::Display for DisclosureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisclosureLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "metadata" => Ok(DisclosureLevel::Metadata),
            "core" => Ok(DisclosureLevel::Core),
            "full" => Ok(DisclosureLevel::Full),
            other => Err(format!(
                "unknown disclosure level '{other}' (expected metadata, core or full)"
            )),
        }
    }
}
