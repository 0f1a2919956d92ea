//! End-to-end behavior of the registry facade

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use skillreg_skills::prelude::*;
use skillreg_skills::{ContentSource, ReasonSource, SkillMetadata, Trigger, TriggerKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Content source that counts how often each level is fetched
#[derive(Default)]
struct Tracked {
    core_fetches: AtomicUsize,
    full_fetches: AtomicUsize,
}

#[async_trait]
impl ContentSource for Tracked {
    async fn core(&self) -> anyhow::Result<String> {
        self.core_fetches.fetch_add(1, Ordering::SeqCst);
        Ok("core".into())
    }

    async fn full(&self) -> anyhow::Result<String> {
        self.full_fetches.fetch_add(1, Ordering::SeqCst);
        Ok("full".into())
    }
}

/// Content source whose core body is never available
struct Unreachable;

#[async_trait]
impl ContentSource for Unreachable {
    async fn core(&self) -> anyhow::Result<String> {
        anyhow::bail!("connection refused")
    }

    async fn full(&self) -> anyhow::Result<String> {
        anyhow::bail!("connection refused")
    }
}

fn inline(skills: Vec<SkillMetadata>) -> SkillRegistry {
    let raw = skills
        .into_iter()
        .map(|m| RawSkill::inline(m, "core", "full"))
        .collect();
    SkillRegistry::initialize(raw, RegistryConfig::default()).unwrap()
}

fn go_skills() -> Vec<SkillMetadata> {
    vec![
        SkillMetadata::new("go-config", "Configuration loading for Go services")
            .with_trigger(Trigger::keyword("config", 8.0)),
        SkillMetadata::new("go-migration", "Database schema migrations for Go services")
            .with_trigger(Trigger::keyword("migration", 10.0))
            .depends_on("go-config")
            .delegates_to("go-config", "database DSN lives in config"),
        SkillMetadata::new("legacy-env", "covers environment variable configuration"),
    ]
}

#[tokio::test]
async fn test_keyword_weight_decides_rank() {
    let registry = inline(go_skills());

    let results = registry
        .find_matching_skills("how do I configure database migrations", &MatchContext::new())
        .await;

    assert_eq!(results[0].skill_id, "go-migration");
    assert_eq!(results[1].skill_id, "go-config");
    assert_eq!(results[0].delegation_hints.len(), 1);
    assert_eq!(results[0].delegation_hints[0].skill_id, "go-config");
    assert_eq!(results[0].level, DisclosureLevel::Core);
}

#[test]
fn test_fallback_ranks_below_explicit_trigger() {
    let registry = inline(go_skills());

    let results = registry.rank("configuration", &MatchContext::new());
    let ids: Vec<_> = results.iter().map(|r| r.skill_id.as_str()).collect();
    assert_eq!(ids, vec!["go-config", "legacy-env"]);

    let legacy = &results[1];
    assert_eq!(legacy.reasons.len(), 1);
    assert_eq!(legacy.reasons[0].source, ReasonSource::Description);
    assert!(legacy.score < results[0].score);
    assert_eq!(
        results[0].reasons[0].source,
        ReasonSource::Trigger(TriggerKind::Keyword)
    );
}

#[test]
fn test_ranking_is_deterministic() {
    let registry = inline(go_skills());
    let context = MatchContext::new()
        .with_file("internal/db/migrations/0001_users.sql")
        .with_task_type("migration");

    let first = registry.rank("config migration environment", &context);
    for _ in 0..10 {
        assert_eq!(registry.rank("config migration environment", &context), first);
    }
}

#[test]
fn test_empty_inputs_give_empty_results() {
    let registry = inline(go_skills());
    assert!(registry.rank("", &MatchContext::new()).is_empty());

    let empty = inline(Vec::new());
    assert!(empty.rank("configure", &MatchContext::new()).is_empty());
}

#[test]
fn test_chain_dependency_order() {
    let registry = inline(vec![
        SkillMetadata::new("a", "top").depends_on("b"),
        SkillMetadata::new("b", "middle").depends_on("c"),
        SkillMetadata::new("c", "bottom"),
    ]);
    assert_eq!(registry.dependency_order("a").unwrap(), vec!["c", "b", "a"]);
}

#[test]
fn test_every_dependency_precedes_its_dependent() {
    let registry = inline(vec![
        SkillMetadata::new("deploy", "x").depends_on("build").depends_on("auth"),
        SkillMetadata::new("build", "x").depends_on("lint").depends_on("fetch"),
        SkillMetadata::new("lint", "x").depends_on("fetch"),
        SkillMetadata::new("auth", "x").depends_on("fetch"),
        SkillMetadata::new("fetch", "x"),
    ]);

    for skill in registry.skills() {
        let order = registry.dependency_order(&skill.id).unwrap();
        let pos: HashMap<&str, usize> = order
            .iter()
            .enumerate()
            .map(|(i, id)| (id.as_str(), i))
            .collect();
        assert_eq!(order.last(), Some(&skill.id));
        for id in &order {
            for dep in &registry.get(id).unwrap().depends_on {
                assert!(pos[dep.as_str()] < pos[id.as_str()]);
            }
        }
    }
}

#[test]
fn test_mutual_dependency_is_rejected_with_path() {
    let raw = vec![
        RawSkill::inline(SkillMetadata::new("x", "x").depends_on("y"), "", ""),
        RawSkill::inline(SkillMetadata::new("y", "y").depends_on("x"), "", ""),
    ];
    let errors = SkillRegistry::initialize(raw, RegistryConfig::default()).unwrap_err();
    assert_eq!(
        errors,
        vec![SkillError::CircularDependency {
            path: vec!["x".into(), "y".into(), "x".into()],
        }]
    );
}

#[test]
fn test_missing_references_reported_individually() {
    let raw = vec![RawSkill::inline(
        SkillMetadata::new("lonely", "x")
            .depends_on("friend")
            .delegates_to("helper", "never registered"),
        "",
        "",
    )];
    let errors = SkillRegistry::initialize(raw, RegistryConfig::default()).unwrap_err();
    let missing: Vec<_> = errors
        .iter()
        .map(|e| match e {
            SkillError::MissingDependency { missing_id, .. } => missing_id.as_str(),
            other => panic!("unexpected error {other}"),
        })
        .collect();
    assert_eq!(missing, vec!["friend", "helper"]);
}

#[tokio::test]
async fn test_full_upgrade_loads_dependencies_without_refetching_core() {
    let f_source = Arc::new(Tracked::default());
    let g_source = Arc::new(Tracked::default());
    let registry = SkillRegistry::initialize(
        vec![
            RawSkill::new(SkillMetadata::new("f", "feature").depends_on("g"), f_source.clone()),
            RawSkill::new(SkillMetadata::new("g", "groundwork"), g_source.clone()),
        ],
        RegistryConfig::default(),
    )
    .unwrap();

    registry.ensure_level("f", DisclosureLevel::Core).await.unwrap();
    assert_eq!(registry.level("f").unwrap(), DisclosureLevel::Core);
    assert_eq!(registry.level("g").unwrap(), DisclosureLevel::Metadata);

    let full = registry.ensure_level("f", DisclosureLevel::Full).await.unwrap();
    assert_eq!(&*full, "full");
    assert_eq!(registry.level("f").unwrap(), DisclosureLevel::Full);
    assert!(registry.level("g").unwrap() >= DisclosureLevel::Core);
    assert_eq!(f_source.core_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(g_source.core_fetches.load(Ordering::SeqCst), 1);
    assert_eq!(g_source.full_fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_levels_never_go_down() {
    let registry = inline(vec![SkillMetadata::new("solo", "x")]);
    let mut seen = Vec::new();

    for target in [
        DisclosureLevel::Core,
        DisclosureLevel::Metadata,
        DisclosureLevel::Full,
        DisclosureLevel::Core,
        DisclosureLevel::Metadata,
    ] {
        registry.ensure_level("solo", target).await.unwrap();
        seen.push(registry.level("solo").unwrap());
    }

    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(seen.last(), Some(&DisclosureLevel::Full));
}

#[tokio::test]
async fn test_activation_failure_is_reported_not_fatal() {
    let registry = SkillRegistry::initialize(
        vec![
            RawSkill::new(
                SkillMetadata::new("offline", "x").with_trigger(Trigger::keyword("deploy", 5.0)),
                Arc::new(Unreachable),
            ),
            RawSkill::inline(
                SkillMetadata::new("online", "x").with_trigger(Trigger::keyword("deploy", 2.0)),
                "core",
                "full",
            ),
        ],
        RegistryConfig::default(),
    )
    .unwrap();

    let results = registry
        .find_matching_skills("deploy", &MatchContext::new())
        .await;

    assert_eq!(results[0].skill_id, "offline");
    assert_eq!(results[0].level, DisclosureLevel::Metadata);
    assert!(results[0]
        .activation_error
        .as_deref()
        .unwrap()
        .contains("connection refused"));
    assert_eq!(results[1].level, DisclosureLevel::Core);
    assert!(results[1].activation_error.is_none());

    let err = registry
        .ensure_level("offline", DisclosureLevel::Core)
        .await
        .unwrap_err();
    assert!(matches!(err, SkillError::LevelLoadFailure { .. }));
}

#[tokio::test]
async fn test_shared_registry_serves_concurrent_queries() {
    let registry = Arc::new(inline(go_skills()));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                let query = if i % 2 == 0 { "migration" } else { "config" };
                registry.find_matching_skills(query, &MatchContext::new()).await
            })
        })
        .collect();

    for handle in handles {
        let results = handle.await.unwrap();
        assert!(!results.is_empty());
    }
    assert_eq!(registry.level("go-migration").unwrap(), DisclosureLevel::Core);
    assert_eq!(registry.level("go-config").unwrap(), DisclosureLevel::Core);
    assert_eq!(registry.pattern_stats().compilations, 0);
}

#[tokio::test]
async fn test_long_dependency_chain_initializes_and_loads() {
    const DEPTH: usize = 100_000;
    let skills = (0..DEPTH)
        .map(|i| {
            let skill = SkillMetadata::new(format!("s{i}"), "link");
            if i + 1 < DEPTH {
                skill.depends_on(format!("s{}", i + 1))
            } else {
                skill
            }
        })
        .collect();
    let registry = inline(skills);

    let order = registry.dependency_order("s0").unwrap();
    assert_eq!(order.len(), DEPTH);
    assert_eq!(order[0], format!("s{}", DEPTH - 1));

    registry
        .ensure_level("s0", DisclosureLevel::Full)
        .await
        .unwrap();
    assert_eq!(registry.level("s0").unwrap(), DisclosureLevel::Full);
    assert_eq!(
        registry.level(&format!("s{}", DEPTH - 1)).unwrap(),
        DisclosureLevel::Core
    );
}
