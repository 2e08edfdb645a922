//! Pattern storage abstraction.
//!
//! The [`PatternStore`] trait defines the operations the naming pipeline
//! needs from a pattern backend, enabling pluggable persistence (JSON file,
//! in-memory). Pattern processing is single-writer (the batch orchestrator
//! is the only mutator), so methods take `&mut self` and no locking
//! discipline is required.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`find_candidates`](PatternStore::find_candidates) | Patterns worth scoring against a signature |
//! | [`create`](PatternStore::create) | Persist a newly learned pattern |
//! | [`record_use`](PatternStore::record_use) | Fold a reuse observation into a pattern |
//! | [`stats`](PatternStore::stats) | Aggregate counts for reporting |

pub mod memory;

use anyhow::Result;
use thiserror::Error;

use crate::models::{Pattern, Signature};

/// The persisted pattern data could not be read or parsed.
///
/// Learning is an optimization, not a correctness requirement: callers are
/// expected to warn and continue with an empty store rather than crash.
#[derive(Debug, Error)]
#[error("pattern store at {path} is unreadable: {detail}")]
pub struct StoreCorruptionError {
    pub path: String,
    pub detail: String,
}

/// Aggregate pattern store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub total_patterns: usize,
    /// Sum of `times_applied` across all patterns.
    pub total_applications: u64,
    /// Mean of `confidence_avg` across all patterns, 0.0 when empty.
    pub average_confidence: f64,
    /// Up to five `(template, times_applied)` pairs, most used first.
    pub most_used: Vec<(String, u32)>,
}

/// Abstract pattern backend for the naming pipeline.
pub trait PatternStore {
    /// Patterns sharing at least one keyword with `signature`.
    ///
    /// A cheap prefilter: the matcher still scores and gates every
    /// candidate, so returning extra patterns is harmless.
    fn find_candidates(&self, signature: &Signature) -> Vec<Pattern>;

    /// Persist a new pattern learned from a naming decision.
    fn create(&mut self, signature: &Signature, template: &str, confidence: f64)
        -> Result<Pattern>;

    /// Record one reuse of `pattern_id` observed at `confidence`.
    ///
    /// Updates `times_applied`, the running `confidence_avg`, and
    /// `last_used_at`. Fails if the pattern does not exist.
    fn record_use(&mut self, pattern_id: &str, confidence: f64) -> Result<Pattern>;

    /// Aggregate statistics for reporting.
    fn stats(&self) -> StoreStats;
}

/// Compute [`StoreStats`] from a pattern slice; shared by implementations.
pub fn compute_stats(patterns: &[Pattern]) -> StoreStats {
    let total_patterns = patterns.len();
    let total_applications = patterns.iter().map(|p| u64::from(p.times_applied)).sum();
    let average_confidence = if patterns.is_empty() {
        0.0
    } else {
        patterns.iter().map(|p| p.confidence_avg).sum::<f64>() / patterns.len() as f64
    };

    let mut most_used: Vec<(String, u32)> = patterns
        .iter()
        .map(|p| (p.template.clone(), p.times_applied))
        .collect();
    most_used.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    most_used.truncate(5);

    StoreStats {
        total_patterns,
        total_applications,
        average_confidence,
        most_used,
    }
}
