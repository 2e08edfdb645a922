//! Core data models used throughout Docket.
//!
//! These types represent the signatures, learned patterns, and ledger
//! entries that flow through the naming pipeline. [`Pattern`] and
//! [`LedgerEntry`] are the two persisted shapes; their serde form is the
//! on-disk format, so field changes here are format changes.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Number of leading characters that participate in the content hash.
const HASH_PREFIX_CHARS: usize = 2000;

/// A normalized keyword set derived from a document's text.
///
/// Order-independent by construction (`BTreeSet`), duplicates collapse.
/// `considered` is the number of distinct qualifying terms seen before
/// the frequency cap was applied, kept for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub terms: BTreeSet<String>,
    pub considered: usize,
}

impl Signature {
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn contains(&self, term: &str) -> bool {
        self.terms.contains(term)
    }
}

/// A learned naming template plus the signature that produced it and
/// usage statistics.
///
/// Lifecycle: created when a non-pattern-sourced naming decision clears
/// the learning threshold; updated through [`Pattern::record_observation`]
/// each time the matcher selects it; never deleted automatically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    /// Description component of the name, independent of any date.
    pub template: String,
    /// Defining keywords, stored as an ordered list for readable files.
    pub keywords: Vec<String>,
    /// Number of times the matcher reused this pattern. Starts at 0;
    /// the creation confidence is still the first observation.
    pub times_applied: u32,
    /// Running mean over the creation confidence and every reuse.
    pub confidence_avg: f64,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
}

impl Pattern {
    /// Build a fresh pattern from a signature and the confidence of the
    /// decision that produced it.
    pub fn new(signature: &Signature, template: &str, confidence: f64, now: DateTime<Utc>) -> Self {
        let mut keywords: Vec<String> = signature.terms.iter().cloned().collect();
        keywords.sort();
        Pattern {
            id: Uuid::new_v4().to_string(),
            template: template.to_string(),
            keywords,
            times_applied: 0,
            confidence_avg: confidence,
            created_at: now,
            last_used_at: now,
        }
    }

    /// Deduplicated view of the defining keywords.
    pub fn keyword_set(&self) -> BTreeSet<&str> {
        self.keywords.iter().map(|k| k.as_str()).collect()
    }

    /// Fold one more confidence observation into the running mean.
    ///
    /// The observation count is `times_applied + 1`: the creation
    /// confidence counts as the first observation even though
    /// `times_applied` starts at 0.
    pub fn record_observation(&mut self, confidence: f64, now: DateTime<Utc>) {
        let n = f64::from(self.times_applied + 1);
        self.confidence_avg = (self.confidence_avg * n + confidence) / (n + 1.0);
        self.times_applied += 1;
        self.last_used_at = now;
    }
}

/// Where a naming decision came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySource {
    /// The external naming backend produced the name.
    Ai,
    /// A stored pattern was reused.
    Pattern,
    /// A user rename, trusted at full confidence.
    Correction,
}

impl EntrySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::Ai => "ai",
            EntrySource::Pattern => "pattern",
            EntrySource::Correction => "correction",
        }
    }
}

/// What actually happened to the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryOutcome {
    Applied,
    DryRun,
    Skipped,
}

impl EntryOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryOutcome::Applied => "applied",
            EntryOutcome::DryRun => "dry-run",
            EntryOutcome::Skipped => "skipped",
        }
    }
}

/// One naming decision, as recorded in the ledger.
///
/// Entries are append-only: a correction never edits a prior entry, it
/// appends a new one referencing the same original path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub timestamp: DateTime<Utc>,
    pub original_path: String,
    pub original_name: String,
    pub new_name: String,
    /// Date component of the identity (`YYYY-MM-DD`), if one was found.
    pub date: Option<String>,
    /// Description component of the identity.
    pub description: String,
    pub confidence: f64,
    pub source: EntrySource,
    /// Model identifier when `source = ai`.
    pub model: Option<String>,
    /// The pattern that produced this name when `source = pattern`.
    pub pattern_id: Option<String>,
    pub content_hash: String,
    /// `native` or `ocr`, document-level.
    pub extraction_method: String,
    pub reasoning: Option<String>,
    pub outcome: EntryOutcome,
}

/// Short stable hash over the leading text, used to recognize a document
/// across runs regardless of its filename.
///
/// Whitespace-normalized and lower-cased so native and re-extracted text
/// of the same document agree; truncated to 16 hex digits because this is
/// an identity aid, not a cryptographic commitment.
pub fn content_hash(text: &str) -> String {
    let prefix: String = text.chars().take(HASH_PREFIX_CHARS).collect();
    let normalized = prefix
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}
