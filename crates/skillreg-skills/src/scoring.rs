//! Trigger scoring and ranking
//!
//! Every fired trigger adds its weight to the score. When nothing fires,
//! the query is compared against the skill description by token overlap,
//! scaled by [`FALLBACK_WEIGHT`]. Since [`FALLBACK_WEIGHT`] is below
//! [`MIN_TRIGGER_WEIGHT`], any fired trigger outranks any fallback match.

use skillreg_types::{
    DelegationHint, DisclosureLevel, MatchContext, MatchReason, MatchResult, ReasonSource,
    SkillMetadata, Trigger,
};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use tracing::debug;

use crate::config::RegistryConfig;
use crate::patterns::PatternCache;

/// Smallest weight an explicit trigger may carry
pub const MIN_TRIGGER_WEIGHT: f64 = 1.0;
/// Scale of a description fallback match (overlap ratio times this)
pub const FALLBACK_WEIGHT: f64 = 0.5;

/// Tokens shorter than this never count toward description overlap
const MIN_TOKEN_LEN: usize = 3;

const STOP_WORDS: &[&str] = &[
    "and", "are", "can", "does", "for", "from", "how", "into", "the", "this", "that", "use",
    "what", "when", "with", "you", "your",
];

/// Query text and context, normalized once per ranking pass
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    text: String,
    lowered: String,
    tokens: BTreeSet<String>,
    files: Vec<String>,
}

impl PreparedQuery {
    /// Combine the explicit query with the context's query and task type
    #[must_use]
    pub fn new(query: &str, context: &MatchContext) -> Self {
        let mut parts: Vec<&str> = Vec::new();
        for part in [
            Some(query),
            context.query.as_deref(),
            context.task_type.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            let part = part.trim();
            if !part.is_empty() && !parts.contains(&part) {
                parts.push(part);
            }
        }
        let text = parts.join("\n");
        let lowered = text.to_lowercase();
        let tokens = tokenize(&text);

        let mut files = Vec::new();
        if let Some(path) = context.file_path.as_deref().filter(|p| !p.is_empty()) {
            let path = path.replace('\\', "/");
            if let Some(name) = path.rsplit('/').next().filter(|n| *n != path) {
                files.push(name.to_string());
            }
            files.insert(0, path);
        }
        if let Some(ext) = context.extension() {
            files.push(format!("file.{ext}"));
        }

        Self {
            text,
            lowered,
            tokens,
            files,
        }
    }

    /// Whether there is no text and no file to match against
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.files.is_empty()
    }
}

/// Check a trigger the way scoring will use it
///
/// # Errors
/// Returns a human-readable reason when the trigger can never be scored
pub fn validate_trigger(trigger: &Trigger, patterns: &PatternCache) -> Result<(), String> {
    let weight = trigger.weight();
    if !weight.is_finite() || weight < MIN_TRIGGER_WEIGHT {
        return Err(format!(
            "weight {weight} must be a finite number of at least {MIN_TRIGGER_WEIGHT}"
        ));
    }
    if trigger.value().trim().is_empty() {
        return Err("value cannot be empty".to_string());
    }
    match trigger {
        Trigger::Pattern { value, .. } => patterns
            .regex(value)
            .map(|_| ())
            .map_err(|e| e.reason),
        Trigger::FileGlob { value, .. } => {
            patterns.glob(value).map(|_| ()).map_err(|e| e.reason)
        }
        Trigger::Keyword { .. } => Ok(()),
    }
}

/// Score one skill against a prepared query
///
/// Returns the total and the reasons in trigger order. A zero score means
/// no match.
#[must_use]
pub fn score(
    skill: &SkillMetadata,
    query: &PreparedQuery,
    patterns: &PatternCache,
) -> (f64, Vec<MatchReason>) {
    let mut total = 0.0;
    let mut reasons = Vec::new();

    for trigger in &skill.triggers {
        if fires(trigger, query, patterns) {
            total += trigger.weight();
            reasons.push(MatchReason {
                source: ReasonSource::Trigger(trigger.kind()),
                matched: trigger.value().to_string(),
                weight: trigger.weight(),
            });
        }
    }

    if reasons.is_empty() {
        let (ratio, overlap) = description_overlap(&query.tokens, &skill.description);
        if ratio > 0.0 {
            let weight = FALLBACK_WEIGHT * ratio;
            total = weight;
            reasons.push(MatchReason {
                source: ReasonSource::Description,
                matched: overlap.join(" "),
                weight,
            });
        }
    }

    (total, reasons)
}

fn fires(trigger: &Trigger, query: &PreparedQuery, patterns: &PatternCache) -> bool {
    match trigger {
        Trigger::Keyword { value, .. } => {
            let keyword = value.trim().to_lowercase();
            !query.lowered.is_empty() && !keyword.is_empty() && query.lowered.contains(&keyword)
        }
        Trigger::Pattern { value, .. } => {
            if query.text.is_empty() {
                return false;
            }
            match patterns.regex(value) {
                Ok(re) => re.is_match(&query.text),
                Err(e) => {
                    debug!("Skipping unscorable pattern trigger: {}", e);
                    false
                }
            }
        }
        Trigger::FileGlob { value, .. } => {
            if query.files.is_empty() {
                return false;
            }
            match patterns.glob(value) {
                Ok(glob) => query.files.iter().any(|f| glob.matches(f)),
                Err(e) => {
                    debug!("Skipping unscorable glob trigger: {}", e);
                    false
                }
            }
        }
    }
}

/// Share of query tokens that also appear in the description
fn description_overlap(query_tokens: &BTreeSet<String>, description: &str) -> (f64, Vec<String>) {
    if query_tokens.is_empty() {
        return (0.0, Vec::new());
    }
    let described = tokenize(description);
    let overlap: Vec<String> = query_tokens.intersection(&described).cloned().collect();

    #[allow(clippy::cast_precision_loss)]
    let ratio = overlap.len() as f64 / query_tokens.len() as f64;
    (ratio, overlap)
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
        .filter(|t| !STOP_WORDS.contains(&t.as_str()))
        .collect()
}

/// Score every skill, drop zero scores, and order the rest
///
/// Sorted by score descending, then id ascending. The top result carries a
/// hint for each `delegates_to` target whose own score exceeds
/// `config.delegation_threshold`. Every result starts at
/// [`DisclosureLevel::Metadata`]; the registry fills in the real level.
#[must_use]
pub fn rank(
    skills: &[SkillMetadata],
    query: &PreparedQuery,
    patterns: &PatternCache,
    config: &RegistryConfig,
) -> Vec<MatchResult> {
    if query.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<MatchResult> = skills
        .iter()
        .filter_map(|skill| {
            let (total, reasons) = score(skill, query, patterns);
            (total > 0.0).then(|| MatchResult {
                skill_id: skill.id.clone(),
                score: total,
                reasons,
                delegation_hints: Vec::new(),
                level: DisclosureLevel::Metadata,
                activation_error: None,
            })
        })
        .collect();

    results.sort_by(|a, b| match b.score.total_cmp(&a.score) {
        Ordering::Equal => a.skill_id.cmp(&b.skill_id),
        other => other,
    });

    let scores: HashMap<&str, f64> = results
        .iter()
        .map(|r| (r.skill_id.as_str(), r.score))
        .collect();
    let hints = results
        .first()
        .and_then(|top| skills.iter().find(|s| s.id == top.skill_id))
        .map(|top| {
            top.delegates_to
                .iter()
                .filter_map(|(target, hint)| {
                    let target_score = scores.get(target.as_str()).copied()?;
                    (target_score > config.delegation_threshold).then(|| DelegationHint {
                        skill_id: target.clone(),
                        hint: hint.clone(),
                        score: target_score,
                    })
                })
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    if let Some(top) = results.first_mut() {
        top.delegation_hints = hints;
    }
    if let Some(limit) = config.max_results {
        results.truncate(limit);
    }

    results
}
