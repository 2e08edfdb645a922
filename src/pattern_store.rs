//! File-backed pattern store.
//!
//! Patterns live in a single human-readable `patterns.json`. The whole file
//! is loaded at open and rewritten through a temp-file rename on every
//! mutation, so a crash mid-write never leaves a torn store behind.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use docket_core::models::{Pattern, Signature};
use docket_core::store::{compute_stats, PatternStore, StoreCorruptionError, StoreStats};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const STORE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PatternsFile {
    version: u32,
    last_updated: DateTime<Utc>,
    patterns: Vec<Pattern>,
}

/// Pattern store persisted as pretty-printed JSON.
#[derive(Debug)]
pub struct JsonPatternStore {
    path: PathBuf,
    patterns: Vec<Pattern>,
}

impl JsonPatternStore {
    /// Open the store at `path`. A missing file is an empty store; an
    /// unparseable one is [`StoreCorruptionError`] so the caller can decide
    /// whether to continue without learning.
    pub fn open(path: &Path) -> Result<Self, StoreCorruptionError> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                patterns: Vec::new(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| StoreCorruptionError {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;

        let file: PatternsFile =
            serde_json::from_str(&content).map_err(|e| StoreCorruptionError {
                path: path.display().to_string(),
                detail: e.to_string(),
            })?;

        debug!(path = %path.display(), patterns = file.patterns.len(), "opened pattern store");
        Ok(Self {
            path: path.to_path_buf(),
            patterns: file.patterns,
        })
    }

    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    fn save(&self) -> Result<()> {
        let file = PatternsFile {
            version: STORE_VERSION,
            last_updated: Utc::now(),
            patterns: self.patterns.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create data dir: {}", parent.display()))?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace {}", self.path.display()))?;
        Ok(())
    }
}

impl PatternStore for JsonPatternStore {
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
        self.save()?;
        Ok(pattern)
    }

    fn record_use(&mut self, pattern_id: &str, confidence: f64) -> Result<Pattern> {
        let Some(pattern) = self.patterns.iter_mut().find(|p| p.id == pattern_id) else {
            bail!("unknown pattern id: {}", pattern_id);
        };
        pattern.record_observation(confidence, Utc::now());
        let updated = pattern.clone();
        self.save()?;
        Ok(updated)
    }

    fn stats(&self) -> StoreStats {
        compute_stats(&self.patterns)
    }
}
