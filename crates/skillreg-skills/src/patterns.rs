//! Compile-once cache for regex and glob matchers
//!
//! Shared by every concurrent scoring call. Reads take a shared lock;
//! compilation happens outside the lock, and only the first result stored
//! for a source is kept and counted. Failed compilations are never cached.

use parking_lot::RwLock;
use regex::{Regex, RegexBuilder};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::PatternError;

/// Counters exposed for diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Distinct compiled sources
    pub entries: usize,
    /// Compilations whose result was stored
    pub compilations: u64,
    /// Lookups answered from the cache
    pub hits: u64,
}

/// Memoized matcher compiler keyed by exact source string
#[derive(Debug, Default)]
pub struct PatternCache {
    regexes: RwLock<HashMap<String, Arc<Regex>>>,
    globs: RwLock<HashMap<String, Arc<glob::Pattern>>>,
    compilations: AtomicU64,
    hits: AtomicU64,
}

impl PatternCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile a regex source (case-insensitive dialect), reusing a cached matcher
    ///
    /// # Errors
    /// Returns [`PatternError`] if the source is not a valid regex
    pub fn regex(&self, source: &str) -> Result<Arc<Regex>, PatternError> {
        self.get_or_compile(&self.regexes, source, |s| {
            RegexBuilder::new(s)
                .case_insensitive(true)
                .build()
                .map_err(|e| e.to_string())
        })
    }

    /// Compile a glob source, reusing a cached matcher
    ///
    /// # Errors
    /// Returns [`PatternError`] if the source is not a valid glob
    pub fn glob(&self, source: &str) -> Result<Arc<glob::Pattern>, PatternError> {
        self.get_or_compile(&self.globs, source, |s| {
            glob::Pattern::new(s).map_err(|e| e.to_string())
        })
    }

    /// Current counters
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.regexes.read().len() + self.globs.read().len(),
            compilations: self.compilations.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
        }
    }

    fn get_or_compile<T>(
        &self,
        map: &RwLock<HashMap<String, Arc<T>>>,
        source: &str,
        compile: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<Arc<T>, PatternError> {
        if let Some(hit) = map.read().get(source) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(Arc::clone(hit));
        }

        let compiled = compile(source).map_err(|reason| PatternError {
            pattern: source.to_string(),
            reason,
        })?;

        let mut entries = map.write();
        match entries.entry(source.to_string()) {
            // Lost a race with another compiler of the same source
            Entry::Occupied(existing) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(Arc::clone(existing.get()))
            }
            Entry::Vacant(slot) => {
                self.compilations.fetch_add(1, Ordering::Relaxed);
                debug!("Compiled matcher: {}", source);
                Ok(Arc::clone(slot.insert(Arc::new(compiled))))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_regex_compiled_once() {
        let cache = PatternCache::new();
        let first = cache.regex(r"migrat(e|ion)").unwrap();
        let second = cache.regex(r"migrat(e|ion)").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            cache.stats(),
            CacheStats {
                entries: 1,
                compilations: 1,
                hits: 1,
            }
        );
    }

    #[test]
    fn test_regex_is_case_insensitive() {
        let cache = PatternCache::new();
        let re = cache.regex("docker").unwrap();
        assert!(re.is_match("Build a Docker image"));
    }

    #[test]
    fn test_failed_compile_not_cached() {
        let cache = PatternCache::new();
        let err = cache.regex("(unclosed").unwrap_err();
        assert_eq!(err.pattern, "(unclosed");
        assert_eq!(cache.stats().entries, 0);

        // A retry with the same bad source fails again rather than hitting a poisoned entry
        assert!(cache.regex("(unclosed").is_err());
        assert_eq!(cache.stats().compilations, 0);
    }

    #[test]
    fn test_glob_and_regex_keyed_separately() {
        let cache = PatternCache::new();
        cache.regex("*.rs").unwrap_err();
        let glob = cache.glob("*.rs").unwrap();
        assert!(glob.matches("src/main.rs"));
        assert_eq!(cache.stats().entries, 1);
    }

    #[test]
    fn test_concurrent_compiles_store_one_entry() {
        let cache = Arc::new(PatternCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.regex(r"\bdeploy(ment)?\b").unwrap())
            })
            .collect();

        let matchers: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(matchers.iter().all(|m| Arc::ptr_eq(m, &matchers[0])));

        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.compilations, 1);
        assert_eq!(stats.hits, 7);
    }
}
