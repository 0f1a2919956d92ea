//! Skill discovery across multiple directories
//!
//! Scans each configured directory for `<skill>/SKILL.md` folders and turns
//! them into [`RawSkill`] records. Only frontmatter is read here; bodies
//! stay on disk until the registry asks for them.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::registry::RawSkill;
use crate::skill::{SkillFile, SKILL_FILE};

/// Result of a discovery scan
#[derive(Debug, Default)]
pub struct Discovered {
    /// Records ready for [`SkillRegistry::initialize`](crate::SkillRegistry::initialize)
    pub skills: Vec<RawSkill>,
    /// Skill folders whose SKILL.md could not be read or parsed
    pub failures: Vec<(PathBuf, anyhow::Error)>,
}

impl Discovered {
    /// Whether every skill folder was read
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Ordered list of directories to scan
#[derive(Debug, Clone, Default)]
pub struct SkillDirectories {
    directories: Vec<PathBuf>,
}

impl SkillDirectories {
    /// Create an empty directory list
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a skills directory to scan
    #[must_use]
    pub fn add_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directories.push(dir.into());
        self
    }

    /// Add personal skills directory: ~/.skillreg/skills/
    #[must_use]
    pub fn with_personal_skills(self) -> Self {
        if let Some(home) = dirs::home_dir() {
            self.add_directory(home.join(".skillreg").join("skills"))
        } else {
            warn!("Could not find home directory for personal skills");
            self
        }
    }

    /// Add project skills directory: ./.skillreg/skills/
    #[must_use]
    pub fn with_project_skills(self) -> Self {
        self.add_directory(PathBuf::from(".skillreg/skills"))
    }

    /// Configured directories, in scan order
    #[must_use]
    pub fn directories(&self) -> &[PathBuf] {
        &self.directories
    }

    /// Scan all configured directories and collect skill records
    ///
    /// Missing directories and folders without a SKILL.md are skipped. A
    /// SKILL.md that cannot be parsed is reported in
    /// [`Discovered::failures`]. Within a directory, skills are returned in
    /// path order so registry insertion order is stable.
    ///
    /// # Errors
    /// Returns an error if an existing directory cannot be listed
    pub fn discover(&self) -> Result<Discovered> {
        info!(
            "Starting skills discovery in {} directories",
            self.directories.len()
        );

        let mut found = Discovered::default();
        for dir in &self.directories {
            if !dir.exists() {
                debug!("Skills directory does not exist: {:?}", dir);
                continue;
            }

            if !dir.is_dir() {
                warn!("Skills path is not a directory: {:?}", dir);
                continue;
            }

            scan_directory(dir, &mut found)?;
        }

        info!(
            "Discovered {} skills ({} unreadable)",
            found.skills.len(),
            found.failures.len()
        );
        Ok(found)
    }
}

/// Scan a single directory for skills
fn scan_directory(dir: &Path, found: &mut Discovered) -> Result<()> {
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?;

    let mut folders = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            folders.push(path);
        }
    }
    folders.sort();

    for path in folders {
        if !path.join(SKILL_FILE).is_file() {
            debug!("Skipping {:?}: no {}", path, SKILL_FILE);
            continue;
        }

        match SkillFile::metadata_from_dir(&path) {
            Ok((metadata, rejected, file)) => {
                debug!("Discovered skill: {} at {:?}", metadata.id, path);
                let skill = RawSkill::new(metadata, Arc::new(file)).with_rejected_triggers(rejected);
                found.skills.push(skill);
            }
            Err(e) => {
                warn!("Failed to load skill from {:?}: {:#}", path, e);
                found.failures.push((path, e));
            }
        }
    }

    Ok(())
}
