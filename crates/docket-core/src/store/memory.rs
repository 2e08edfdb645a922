//! In-memory [`PatternStore`] implementation.
//!
//! Used in tests and as the degraded fallback when the persisted store is
//! corrupt: the pipeline keeps matching and learning for the rest of the
//! batch, it just won't remember anything afterward.

use anyhow::{bail, Result};
use chrono::Utc;

use crate::models::{Pattern, Signature};

use super::{compute_stats, PatternStore, StoreStats};

/// Volatile pattern store backed by a `Vec`.
#[derive(Default)]
pub struct MemoryPatternStore {
    patterns: Vec<Pattern>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with existing patterns (used by tests).
    pub fn with_patterns(patterns: Vec<Pattern>) -> Self {
        Self { patterns }
    }
}

impl PatternStore for MemoryPatternStore {
    fn find_candidates(&self, signature: &Signature) -> Vec<Pattern> {
        self.patterns
            .iter()
            .filter(|p| p.keywords.iter().any(|k| signature.contains(k)))
            .cloned()
            .collect()
    }

    fn create(
        &mut self,
        signature: &Signature,
        template: &str,
        confidence: f64,
    ) -> Result<Pattern> {
        let pattern = Pattern::new(signature, template, confidence, Utc::now());
        self.patterns.push(pattern.clone());
        Ok(pattern)
    }

    fn record_use(&mut self, pattern_id: &str, confidence: f64) -> Result<Pattern> {
        let Some(pattern) = self.patterns.iter_mut().find(|p| p.id == pattern_id) else {
            bail!("unknown pattern id: {}", pattern_id);
        };
        pattern.record_observation(confidence, Utc::now());
        Ok(pattern.clone())
    }

    fn stats(&self) -> StoreStats {
        compute_stats(&self.patterns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sig(terms: &[&str]) -> Signature {
        Signature {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            considered: terms.len(),
        }
    }

    #[test]
    fn create_then_find_candidates() {
        let mut store = MemoryPatternStore::new();
        store
            .create(&sig(&["electric", "utility"]), "Electric_Bill", 0.9)
            .unwrap();

        let hits = store.find_candidates(&sig(&["electric", "meter"]));
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].template, "Electric_Bill");

        let misses = store.find_candidates(&sig(&["water", "sewer"]));
        assert!(misses.is_empty());
    }

    #[test]
    fn record_use_updates_running_mean() {
        let mut store = MemoryPatternStore::new();
        let p = store.create(&sig(&["a", "b"]), "T", 0.9).unwrap();

        store.record_use(&p.id, 0.8).unwrap();
        store.record_use(&p.id, 0.6).unwrap();
        let updated = store.record_use(&p.id, 1.0).unwrap();

        assert_eq!(updated.times_applied, 3);
        assert!((updated.confidence_avg - 0.825).abs() < 1e-9);
        assert!(updated.last_used_at >= p.created_at);
    }

    #[test]
    fn record_use_unknown_id_fails() {
        let mut store = MemoryPatternStore::new();
        assert!(store.record_use("nope", 0.9).is_err());
    }

    #[test]
    fn stats_aggregate() {
        let mut store = MemoryPatternStore::new();
        let a = store.create(&sig(&["a"]), "A", 0.8).unwrap();
        store.create(&sig(&["b"]), "B", 0.6).unwrap();
        store.record_use(&a.id, 0.8).unwrap();
        store.record_use(&a.id, 0.8).unwrap();

        let stats = store.stats();
        assert_eq!(stats.total_patterns, 2);
        assert_eq!(stats.total_applications, 2);
        assert_eq!(stats.most_used[0], ("A".to_string(), 2));
        assert!((stats.average_confidence - 0.7).abs() < 1e-9);
    }

    #[test]
    fn empty_store_stats() {
        let store = MemoryPatternStore::new();
        let stats = store.stats();
        assert_eq!(stats.total_patterns, 0);
        assert_eq!(stats.average_confidence, 0.0);
        assert!(stats.most_used.is_empty());
    }
}
