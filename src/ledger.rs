//! Append-oriented processing ledger.
//!
//! One JSON object per line in `ledger.jsonl`. Appending a line is the only
//! write the pipeline ever performs, so the history of every naming decision
//! survives intact and the file stays greppable. Unparseable lines are
//! skipped with a warning rather than poisoning the whole history.

use anyhow::{Context, Result};
use docket_core::models::{EntryOutcome, EntrySource, LedgerEntry};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
#[error("failed to append to ledger at {path}: {detail}")]
pub struct LedgerWriteError {
    pub path: String,
    pub detail: String,
}

/// Summary of ledger contents for `dkt history`.
#[derive(Debug, Default)]
pub struct LedgerSummary {
    pub total: usize,
    pub applied: usize,
    pub dry_run: usize,
    pub skipped: usize,
    pub by_source: BTreeMap<String, usize>,
    pub by_method: BTreeMap<String, usize>,
    pub average_confidence: f64,
    pub first: Option<chrono::DateTime<chrono::Utc>>,
    pub last: Option<chrono::DateTime<chrono::Utc>>,
}

pub struct Ledger {
    path: PathBuf,
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Load the ledger at `path`; a missing file is an empty history.
    pub fn open(path: &Path) -> Result<Self> {
        let mut entries = Vec::new();
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read ledger: {}", path.display()))?;
            for (lineno, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<LedgerEntry>(line) {
                    Ok(entry) => entries.push(entry),
                    Err(e) => {
                        warn!(
                            path = %path.display(),
                            line = lineno + 1,
                            error = %e,
                            "skipping malformed ledger line"
                        );
                    }
                }
            }
        }
        Ok(Self {
            path: path.to_path_buf(),
            entries,
        })
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Append one entry to the file and the in-memory view.
    pub fn append(&mut self, entry: LedgerEntry) -> Result<(), LedgerWriteError> {
        let line = serde_json::to_string(&entry).map_err(|e| LedgerWriteError {
            path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LedgerWriteError {
                path: self.path.display().to_string(),
                detail: e.to_string(),
            })?;
        }

        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| LedgerWriteError {
                path: self.path.display().to_string(),
                detail: e.to_string(),
            })?;
        writeln!(file, "{}", line).map_err(|e| LedgerWriteError {
            path: self.path.display().to_string(),
            detail: e.to_string(),
        })?;

        self.entries.push(entry);
        Ok(())
    }

    /// Entries newest-first, optionally limited.
    pub fn history(&self, limit: Option<usize>) -> Vec<&LedgerEntry> {
        let mut out: Vec<&LedgerEntry> = self.entries.iter().collect();
        out.reverse();
        if let Some(limit) = limit {
            out.truncate(limit);
        }
        out
    }

    /// Latest entry recorded for `original_path`, if any.
    pub fn find_by_path(&self, original_path: &str) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.original_path == original_path)
    }

    /// Whether a document with this content hash was already applied.
    pub fn already_processed(&self, content_hash: &str) -> bool {
        self.entries
            .iter()
            .any(|e| e.content_hash == content_hash && e.outcome == EntryOutcome::Applied)
    }

    /// Latest user correction recorded for this content hash. Corrections
    /// outrank every model opinion, so the pipeline checks here first.
    pub fn find_correction_by_hash(&self, content_hash: &str) -> Option<&LedgerEntry> {
        self.entries
            .iter()
            .rev()
            .find(|e| e.content_hash == content_hash && e.source == EntrySource::Correction)
    }

    pub fn summary(&self) -> LedgerSummary {
        let mut summary = LedgerSummary {
            total: self.entries.len(),
            ..Default::default()
        };
        let mut confidence_sum = 0.0;
        for entry in &self.entries {
            match entry.outcome {
                EntryOutcome::Applied => summary.applied += 1,
                EntryOutcome::DryRun => summary.dry_run += 1,
                EntryOutcome::Skipped => summary.skipped += 1,
            }
            *summary
                .by_source
                .entry(entry.source.as_str().to_string())
                .or_insert(0) += 1;
            *summary
                .by_method
                .entry(entry.extraction_method.clone())
                .or_insert(0) += 1;
            confidence_sum += entry.confidence;
        }
        if !self.entries.is_empty() {
            summary.average_confidence = confidence_sum / self.entries.len() as f64;
        }
        summary.first = self.entries.first().map(|e| e.timestamp);
        summary.last = self.entries.last().map(|e| e.timestamp);
        summary
    }
}
