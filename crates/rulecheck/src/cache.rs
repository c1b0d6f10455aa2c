//! Analysis result cache
//!
//! Memoizes analyzer output keyed by content hash, dialect, and overlay
//! fingerprint, so fix iterations and suite runs skip re-analyzing text
//! they have already seen. Uses DashMap for lock-free concurrent access.
//! Purely an optimization: a hit returns a clone of the previously
//! produced diagnostics and never changes observable behavior. Nothing is
//! persisted.

use dashmap::DashMap;
use tracing::trace;

use rulecheck_config::OptionsOverlay;
use rulecheck_diagnostics::Diagnostic;

use crate::engine::Dialect;

type CacheKey = (u64, Dialect, u64);

/// In-memory memo of analysis results
#[derive(Debug, Default)]
pub struct AnalysisCache {
    entries: DashMap<CacheKey, Vec<Diagnostic>>,
}

impl AnalysisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(
        &self,
        source: &str,
        dialect: Dialect,
        overlay: &OptionsOverlay,
    ) -> Option<Vec<Diagnostic>> {
        let key = (hash_content(source), dialect, hash_overlay(overlay));
        let hit = self.entries.get(&key).map(|entry| entry.clone());
        if hit.is_some() {
            trace!(dialect = %dialect, "analysis cache hit");
        }
        hit
    }

    pub fn insert(
        &self,
        source: &str,
        dialect: Dialect,
        overlay: &OptionsOverlay,
        diagnostics: Vec<Diagnostic>,
    ) {
        let key = (hash_content(source), dialect, hash_overlay(overlay));
        self.entries.insert(key, diagnostics);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

/// Compute a fast hash of source content
pub fn hash_content(content: &str) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = ahash::AHasher::default();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Fingerprint an overlay independently of declaration order
fn hash_overlay(overlay: &OptionsOverlay) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut pairs: Vec<(&str, &str)> = overlay.iter().collect();
    pairs.sort_unstable();
    let mut hasher = ahash::AHasher::default();
    pairs.hash(&mut hasher);
    hasher.finish()
}
