//! Progressive disclosure of skill content
//!
//! Each skill owns two load-once slots, `core` and `full`. A slot is filled
//! by the first successful fetch and never cleared, so the disclosure level
//! only ever rises. A failed fetch leaves the slot empty and the next call
//! retries. Concurrent upgrades of one skill share a single fetch; upgrades
//! of different skills never wait on each other.

use async_trait::async_trait;
use skillreg_types::DisclosureLevel;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::error::{Result, SkillError};
use crate::resolver::DependencyGraph;

/// Deferred reader of a skill's content bodies
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Main instruction body
    async fn core(&self) -> anyhow::Result<String>;

    /// Body plus reference material
    async fn full(&self) -> anyhow::Result<String>;
}

/// Content already held in memory
#[derive(Debug, Clone, Default)]
pub struct InlineContent {
    /// Returned for `Core`
    pub core: String,
    /// Returned for `Full`
    pub full: String,
}

impl InlineContent {
    /// Create inline content
    pub fn new(core: impl Into<String>, full: impl Into<String>) -> Self {
        Self {
            core: core.into(),
            full: full.into(),
        }
    }
}

#[async_trait]
impl ContentSource for InlineContent {
    async fn core(&self) -> anyhow::Result<String> {
        Ok(self.core.clone())
    }

    async fn full(&self) -> anyhow::Result<String> {
        Ok(self.full.clone())
    }
}

struct SkillSlot {
    source: Arc<dyn ContentSource>,
    core: OnceCell<Arc<str>>,
    full: OnceCell<Arc<str>>,
}

/// Per-skill disclosure state, indexed like the dependency graph
pub struct ProgressiveLoader {
    slots: Vec<SkillSlot>,
}

impl ProgressiveLoader {
    /// Every skill starts at [`DisclosureLevel::Metadata`]
    pub(crate) fn new(sources: Vec<Arc<dyn ContentSource>>) -> Self {
        Self {
            slots: sources
                .into_iter()
                .map(|source| SkillSlot {
                    source,
                    core: OnceCell::new(),
                    full: OnceCell::new(),
                })
                .collect(),
        }
    }

    /// Current level of a skill
    pub(crate) fn level(&self, node: usize) -> DisclosureLevel {
        let slot = &self.slots[node];
        if slot.full.initialized() {
            DisclosureLevel::Full
        } else if slot.core.initialized() {
            DisclosureLevel::Core
        } else {
            DisclosureLevel::Metadata
        }
    }

    /// Raise a skill to `target` and return that level's content
    ///
    /// `Metadata` has no body here; callers render it from the skill record.
    pub(crate) async fn upgrade(
        &self,
        graph: &DependencyGraph,
        node: usize,
        target: DisclosureLevel,
    ) -> Result<Option<Arc<str>>> {
        match target {
            DisclosureLevel::Metadata => Ok(None),
            DisclosureLevel::Core => self.ensure_core(graph, node).await.map(Some),
            DisclosureLevel::Full => self.ensure_full(graph, node).await.map(Some),
        }
    }

    async fn ensure_core(&self, graph: &DependencyGraph, node: usize) -> Result<Arc<str>> {
        let slot = &self.slots[node];
        let id = graph.id(node);

        let content = slot
            .core
            .get_or_try_init(|| async {
                debug!("Fetching core content for skill '{}'", id);
                match slot.source.core().await {
                    Ok(body) => {
                        info!("Skill '{}' upgraded to core", id);
                        Ok(Arc::<str>::from(body))
                    }
                    Err(e) => {
                        warn!("Failed to load core content for skill '{}': {:#}", id, e);
                        Err(SkillError::LevelLoadFailure {
                            skill_id: id.to_string(),
                            level: DisclosureLevel::Core,
                            cause: format!("{e:#}"),
                        })
                    }
                }
            })
            .await?;

        Ok(Arc::clone(content))
    }

    async fn ensure_full(&self, graph: &DependencyGraph, node: usize) -> Result<Arc<str>> {
        let slot = &self.slots[node];
        if let Some(full) = slot.full.get() {
            return Ok(Arc::clone(full));
        }

        self.ensure_core(graph, node).await?;

        for dep in graph.closure_order(node)? {
            if dep != node {
                self.ensure_core(graph, dep).await?;
            }
        }

        let id = graph.id(node);
        let content = slot
            .full
            .get_or_try_init(|| async {
                debug!("Fetching full content for skill '{}'", id);
                match slot.source.full().await {
                    Ok(body) => {
                        info!("Skill '{}' upgraded to full", id);
                        Ok(Arc::<str>::from(body))
                    }
                    Err(e) => {
                        warn!("Failed to load full content for skill '{}': {:#}", id, e);
                        Err(SkillError::LevelLoadFailure {
                            skill_id: id.to_string(),
                            level: DisclosureLevel::Full,
                            cause: format!("{e:#}"),
                        })
                    }
                }
            })
            .await?;

        Ok(Arc::clone(content))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use skillreg_types::SkillMetadata;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts fetches; optionally fails until switched on
    #[derive(Default)]
    struct CountingSource {
        core_fetches: AtomicUsize,
        full_fetches: AtomicUsize,
        broken: AtomicBool,
    }

    #[async_trait]
    impl ContentSource for CountingSource {
        async fn core(&self) -> anyhow::Result<String> {
            tokio::time::sleep(Duration::from_millis(5)).await;
            if self.broken.load(Ordering::SeqCst) {
                anyhow::bail!("storage offline");
            }
            self.core_fetches.fetch_add(1, Ordering::SeqCst);
            Ok("core body".into())
        }

        async fn full(&self) -> anyhow::Result<String> {
            if self.broken.load(Ordering::SeqCst) {
                anyhow::bail!("storage offline");
            }
            self.full_fetches.fetch_add(1, Ordering::SeqCst);
            Ok("full body".into())
        }
    }

    fn setup(
        skills: &[SkillMetadata],
    ) -> (DependencyGraph, ProgressiveLoader, Vec<Arc<CountingSource>>) {
        let graph = DependencyGraph::build(skills);
        let sources: Vec<Arc<CountingSource>> =
            skills.iter().map(|_| Arc::new(CountingSource::default())).collect();
        let loader = ProgressiveLoader::new(
            sources
                .iter()
                .map(|s| Arc::clone(s) as Arc<dyn ContentSource>)
                .collect(),
        );
        (graph, loader, sources)
    }

    #[tokio::test]
    async fn test_core_fetched_once() {
        let (graph, loader, sources) = setup(&[SkillMetadata::new("solo", "")]);
        assert_eq!(loader.level(0), DisclosureLevel::Metadata);

        let first = loader.upgrade(&graph, 0, DisclosureLevel::Core).await.unwrap();
        let second = loader.upgrade(&graph, 0, DisclosureLevel::Core).await.unwrap();

        assert_eq!(first.as_deref(), Some("core body"));
        assert_eq!(second.as_deref(), Some("core body"));
        assert_eq!(sources[0].core_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loader.level(0), DisclosureLevel::Core);
    }

    #[tokio::test]
    async fn test_concurrent_upgrades_share_one_fetch() {
        let (graph, loader, sources) = setup(&[SkillMetadata::new("solo", "")]);

        let (a, b, c) = tokio::join!(
            loader.upgrade(&graph, 0, DisclosureLevel::Core),
            loader.upgrade(&graph, 0, DisclosureLevel::Core),
            loader.upgrade(&graph, 0, DisclosureLevel::Full),
        );
        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(sources[0].core_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(sources[0].full_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_full_skips_ahead_from_metadata() {
        let (graph, loader, sources) = setup(&[SkillMetadata::new("solo", "")]);

        let full = loader.upgrade(&graph, 0, DisclosureLevel::Full).await.unwrap();
        assert_eq!(full.as_deref(), Some("full body"));
        assert_eq!(sources[0].core_fetches.load(Ordering::SeqCst), 1);
        assert_eq!(loader.level(0), DisclosureLevel::Full);

        // Asking for less is a no-op
        loader.upgrade(&graph, 0, DisclosureLevel::Core).await.unwrap();
        assert_eq!(loader.level(0), DisclosureLevel::Full);
        assert_eq!(sources[0].core_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_keeps_last_level_and_retries() {
        let (graph, loader, sources) = setup(&[SkillMetadata::new("flaky", "")]);
        loader.upgrade(&graph, 0, DisclosureLevel::Core).await.unwrap();

        sources[0].broken.store(true, Ordering::SeqCst);
        let err = loader
            .upgrade(&graph, 0, DisclosureLevel::Full)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            SkillError::LevelLoadFailure {
                skill_id: "flaky".into(),
                level: DisclosureLevel::Full,
                cause: "storage offline".into(),
            }
        );
        assert_eq!(loader.level(0), DisclosureLevel::Core);

        sources[0].broken.store(false, Ordering::SeqCst);
        loader.upgrade(&graph, 0, DisclosureLevel::Full).await.unwrap();
        assert_eq!(loader.level(0), DisclosureLevel::Full);
    }

    #[tokio::test]
    async fn test_full_pulls_dependencies_to_core() {
        let (graph, loader, sources) = setup(&[
            SkillMetadata::new("f", "").depends_on("g"),
            SkillMetadata::new("g", "").depends_on("h"),
            SkillMetadata::new("h", ""),
            SkillMetadata::new("unrelated", ""),
        ]);

        loader.upgrade(&graph, 0, DisclosureLevel::Full).await.unwrap();
        assert_eq!(loader.level(0), DisclosureLevel::Full);
        assert_eq!(loader.level(1), DisclosureLevel::Core);
        assert_eq!(loader.level(2), DisclosureLevel::Core);
        assert_eq!(loader.level(3), DisclosureLevel::Metadata);
        assert_eq!(sources[1].full_fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_dependency_failure_blocks_full() {
        let (graph, loader, sources) = setup(&[
            SkillMetadata::new("f", "").depends_on("g"),
            SkillMetadata::new("g", ""),
        ]);
        sources[1].broken.store(true, Ordering::SeqCst);

        let err = loader
            .upgrade(&graph, 0, DisclosureLevel::Full)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SkillError::LevelLoadFailure { ref skill_id, level: DisclosureLevel::Core, .. } if skill_id == "g"
        ));
        assert_eq!(loader.level(0), DisclosureLevel::Core);
        assert_eq!(loader.level(1), DisclosureLevel::Metadata);
        assert_eq!(sources[0].full_fetches.load(Ordering::SeqCst), 0);
    }
}
