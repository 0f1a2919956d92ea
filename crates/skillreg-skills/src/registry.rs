//! Skills registry facade
//!
//! Built once from raw records and shared by reference (usually behind an
//! `Arc`) between concurrent callers. Skill metadata and the dependency
//! graph are frozen at construction; only the pattern cache and per-skill
//! disclosure slots change afterwards.

use futures::future::join_all;
use skillreg_types::{DisclosureLevel, MatchContext, MatchResult, SkillMetadata};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::{Result, SkillError};
use crate::loader::{ContentSource, InlineContent, ProgressiveLoader};
use crate::patterns::{CacheStats, PatternCache};
use crate::resolver::DependencyGraph;
use crate::scoring::{self, PreparedQuery};

/// Trigger entry that could not be read into a [`Trigger`](skillreg_types::Trigger)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedTrigger {
    /// The entry as written, `kind:value` when both are present
    pub trigger: String,
    /// Parser message
    pub reason: String,
}

/// A parsed skill record plus its deferred content reader
pub struct RawSkill {
    /// Frontmatter-level fields
    pub metadata: SkillMetadata,
    /// Reader for the `Core` and `Full` bodies
    pub content: Arc<dyn ContentSource>,
    /// Trigger entries dropped while parsing; each one blocks initialization
    pub rejected_triggers: Vec<RejectedTrigger>,
}

impl RawSkill {
    /// Pair metadata with a content source
    pub fn new(metadata: SkillMetadata, content: Arc<dyn ContentSource>) -> Self {
        Self {
            metadata,
            content,
            rejected_triggers: Vec::new(),
        }
    }

    /// Attach trigger entries the parser could not read
    #[must_use]
    pub fn with_rejected_triggers(mut self, rejected: Vec<RejectedTrigger>) -> Self {
        self.rejected_triggers = rejected;
        self
    }

    /// Record whose bodies are already in memory
    pub fn inline(
        metadata: SkillMetadata,
        core: impl Into<String>,
        full: impl Into<String>,
    ) -> Self {
        Self::new(metadata, Arc::new(InlineContent::new(core, full)))
    }
}

impl std::fmt::Debug for RawSkill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawSkill")
            .field("metadata", &self.metadata)
            .field("rejected_triggers", &self.rejected_triggers)
            .finish_non_exhaustive()
    }
}

/// Skills registry: matching, dependency ordering and progressive loading
pub struct SkillRegistry {
    skills: Vec<SkillMetadata>,
    graph: DependencyGraph,
    patterns: PatternCache,
    loader: ProgressiveLoader,
    config: RegistryConfig,
}

impl std::fmt::Debug for SkillRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkillRegistry")
            .field("skills", &self.skills.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SkillRegistry {
    /// Build a registry, or every structural error found
    ///
    /// Duplicate ids, invalid triggers, dangling references and cycles are
    /// all collected in one pass. No registry is returned while any exist.
    /// Every skill starts at [`DisclosureLevel::Metadata`].
    ///
    /// # Errors
    /// Returns the full list of structural errors
    pub fn initialize(
        raw: Vec<RawSkill>,
        config: RegistryConfig,
    ) -> std::result::Result<Self, Vec<SkillError>> {
        let mut rejected = Vec::new();
        let (skills, sources): (Vec<_>, Vec<_>) = raw
            .into_iter()
            .map(|r| {
                rejected.extend(r.rejected_triggers.into_iter().map(|t| {
                    SkillError::InvalidTrigger {
                        skill_id: r.metadata.id.clone(),
                        trigger: t.trigger,
                        reason: t.reason,
                    }
                }));
                (normalize(r.metadata), r.content)
            })
            .unzip();

        let patterns = PatternCache::new();
        let graph = DependencyGraph::build(&skills);
        let errors = structural_errors(&skills, &graph, &patterns, rejected);
        if !errors.is_empty() {
            warn!(
                "Skill registry rejected: {} structural error(s)",
                errors.len()
            );
            for error in &errors {
                warn!("  {}", error);
            }
            return Err(errors);
        }

        let stats = patterns.stats();
        info!(
            "Skill registry initialized: {} skills, {} compiled matchers",
            skills.len(),
            stats.entries
        );

        Ok(Self {
            loader: ProgressiveLoader::new(sources),
            skills,
            graph,
            patterns,
            config,
        })
    }

    /// Re-run structural validation over the registered skills
    #[must_use]
    pub fn validate(&self) -> Vec<SkillError> {
        structural_errors(&self.skills, &self.graph, &self.patterns, Vec::new())
    }

    /// Score and order skills without loading anything
    #[must_use]
    pub fn rank(&self, query: &str, context: &MatchContext) -> Vec<MatchResult> {
        let prepared = PreparedQuery::new(query, context);
        let mut results = scoring::rank(&self.skills, &prepared, &self.patterns, &self.config);
        for result in &mut results {
            if let Some(node) = self.graph.index_of(&result.skill_id) {
                result.level = self.loader.level(node);
            }
        }
        results
    }

    /// Rank skills and lazily load the relevant ones to `Core`
    ///
    /// Results scoring at or above the activation threshold are upgraded
    /// concurrently. A failed upgrade is reported on its result and leaves
    /// the ranking untouched.
    pub async fn find_matching_skills(
        &self,
        query: &str,
        context: &MatchContext,
    ) -> Vec<MatchResult> {
        let mut results = self.rank(query, context);
        debug!("Query matched {} skill(s)", results.len());

        let activations = results
            .iter()
            .enumerate()
            .filter(|(_, r)| r.score >= self.config.activation_threshold)
            .filter_map(|(pos, r)| Some((pos, self.graph.index_of(&r.skill_id)?)))
            .map(|(pos, node)| async move {
                let outcome = self
                    .loader
                    .upgrade(&self.graph, node, DisclosureLevel::Core)
                    .await;
                (pos, node, outcome)
            });

        for (pos, node, outcome) in join_all(activations).await {
            let result = &mut results[pos];
            result.level = self.loader.level(node);
            if let Err(e) = outcome {
                result.activation_error = Some(e.to_string());
            }
        }

        results
    }

    /// Raise a skill to at least `level` and return that level's content
    ///
    /// `Metadata` returns the one-line summary. Asking for a level below
    /// the current one loads nothing. `Full` first brings every transitive
    /// dependency to `Core`, in dependency order.
    ///
    /// # Errors
    /// Returns [`SkillError::SkillNotFound`] for an unknown id and
    /// [`SkillError::LevelLoadFailure`] when content cannot be fetched
    pub async fn ensure_level(&self, id: &str, level: DisclosureLevel) -> Result<Arc<str>> {
        let node = self.node(id)?;
        match self.loader.upgrade(&self.graph, node, level).await? {
            Some(content) => Ok(content),
            None => Ok(Arc::from(self.skills[node].to_summary())),
        }
    }

    /// Load order for executing `id`: its transitive dependencies, then itself
    ///
    /// # Errors
    /// Returns [`SkillError::SkillNotFound`] for an unknown id
    pub fn dependency_order(&self, id: &str) -> Result<Vec<String>> {
        self.graph.dependency_order(id)
    }

    /// Current disclosure level of a skill
    ///
    /// # Errors
    /// Returns [`SkillError::SkillNotFound`] for an unknown id
    pub fn level(&self, id: &str) -> Result<DisclosureLevel> {
        Ok(self.loader.level(self.node(id)?))
    }

    /// Look up a skill's metadata
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&SkillMetadata> {
        self.graph.index_of(id).map(|node| &self.skills[node])
    }

    /// All skills in insertion order
    pub fn skills(&self) -> impl Iterator<Item = &SkillMetadata> {
        self.skills.iter()
    }

    /// Get number of skills
    #[must_use]
    pub fn len(&self) -> usize {
        self.skills.len()
    }

    /// Check if registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.skills.is_empty()
    }

    /// Metadata-level catalogue for a system prompt
    ///
    /// Format:
    /// Available skills:
    /// - skill-id: Description of what this skill does and when to use it
    #[must_use]
    pub fn metadata_summary(&self) -> String {
        if self.skills.is_empty() {
            return String::new();
        }

        let mut sorted: Vec<_> = self.skills.iter().collect();
        sorted.sort_by(|a, b| a.id.cmp(&b.id));

        let mut summary = String::from("Available skills:\n");
        for skill in sorted {
            summary.push_str(&skill.to_summary());
            summary.push('\n');
        }
        summary
    }

    /// Pattern cache counters
    #[must_use]
    pub fn pattern_stats(&self) -> CacheStats {
        self.patterns.stats()
    }

    /// Active configuration
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn node(&self, id: &str) -> Result<usize> {
        self.graph
            .index_of(id)
            .ok_or_else(|| SkillError::SkillNotFound(id.to_string()))
    }
}

/// Drop repeated `depends_on` entries, keeping the first
fn normalize(mut metadata: SkillMetadata) -> SkillMetadata {
    let mut seen = HashSet::new();
    metadata.depends_on.retain(|d| seen.insert(d.clone()));
    metadata
}

fn structural_errors(
    skills: &[SkillMetadata],
    graph: &DependencyGraph,
    patterns: &PatternCache,
    rejected: Vec<SkillError>,
) -> Vec<SkillError> {
    let mut errors = Vec::new();

    let mut seen = HashSet::new();
    for skill in skills {
        if !seen.insert(skill.id.as_str()) {
            errors.push(SkillError::DuplicateSkill {
                skill_id: skill.id.clone(),
            });
        }
    }

    errors.extend(rejected);
    for skill in skills {
        for trigger in &skill.triggers {
            if let Err(reason) = scoring::validate_trigger(trigger, patterns) {
                errors.push(SkillError::InvalidTrigger {
                    skill_id: skill.id.clone(),
                    trigger: trigger.to_string(),
                    reason,
                });
            }
        }
    }

    errors.extend(graph.validate());
    errors.extend(
        graph
            .cycles()
            .into_iter()
            .map(|path| SkillError::CircularDependency { path }),
    );

    errors
}
