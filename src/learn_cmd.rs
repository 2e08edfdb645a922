//! The `dkt learn` command: pattern statistics and manual-correction
//! scanning.
//!
//! A correction is detected when a ledger entry's assigned filename has
//! disappeared from its directory while an unclaimed PDF sits next to it,
//! the strongest signal the user disagreed with a naming decision. Confirmed
//! corrections are re-verified against document content before they are
//! recorded at full confidence.

use anyhow::Result;
use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use docket_core::corrections::{detect_corrections, DirectoryListing};
use docket_core::keywords::keywords;
use docket_core::models::{content_hash, EntryOutcome, EntrySource, LedgerEntry};
use docket_core::store::PatternStore;

use crate::config::{Config, SpeedProfile};
use crate::extract;
use crate::ledger::Ledger;
use crate::ocr::TesseractCli;
use crate::pattern_store::JsonPatternStore;

pub fn run_stats(config: &Config) -> Result<()> {
    let store = JsonPatternStore::open(&config.data.patterns_path())?;
    let stats = store.stats();

    println!("learned patterns");
    println!("  patterns: {}", stats.total_patterns);
    println!("  applications: {}", stats.total_applications);
    println!("  average confidence: {:.2}", stats.average_confidence);
    if !stats.most_used.is_empty() {
        println!("  most used:");
        for (template, count) in &stats.most_used {
            println!("    {} ({}x)", template, count);
        }
    }
    println!("ok");
    Ok(())
}

pub async fn run_scan_corrections(config: &Config, yes: bool) -> Result<()> {
    let mut ledger = Ledger::open(&config.data.ledger_path())?;
    let listing = snapshot_directories(ledger.entries().iter().map(|e| e.original_path.as_str()));
    let candidates = detect_corrections(ledger.entries(), &listing);

    if candidates.is_empty() {
        println!("no manual corrections detected");
        println!("ok");
        return Ok(());
    }

    let mut store = JsonPatternStore::open(&config.data.patterns_path())?;
    let ocr = TesseractCli::new(
        &config.extraction.ocr_language,
        config.extraction.ocr_timeout_secs,
    );

    let mut recorded = 0usize;
    let mut learned = 0usize;

    for candidate in candidates {
        let entry = &candidate.entry;
        println!(
            "correction candidate: {} (was {})",
            candidate.candidate_name, entry.new_name
        );

        if !yes && !confirm("record this correction? [y/N] ")? {
            println!("  skipped");
            continue;
        }

        let dir = Path::new(&entry.original_path)
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_default();
        let candidate_path = dir.join(&candidate.candidate_name);

        // Re-extract: the correction only counts if the renamed file really
        // is the document the original decision was about.
        let document = match extract::extract(
            &candidate_path,
            &config.extraction,
            SpeedProfile::Balanced,
            &ocr,
        )
        .await
        {
            Ok(doc) => doc,
            Err(e) => {
                warn!(path = %candidate_path.display(), error = %e, "cannot verify candidate");
                println!("  cannot verify (extraction failed), skipped");
                continue;
            }
        };
        let full_text = document.full_text();
        let hash = content_hash(&full_text);
        if hash != entry.content_hash {
            debug!(
                expected = %entry.content_hash,
                actual = %hash,
                "content mismatch, not the same document"
            );
            println!("  content differs from the original document, skipped");
            continue;
        }

        let (date, template) = parse_corrected_name(&candidate.candidate_name);

        ledger.append(LedgerEntry {
            timestamp: Utc::now(),
            original_path: entry.original_path.clone(),
            original_name: entry.new_name.clone(),
            new_name: candidate.candidate_name.clone(),
            date: date.clone(),
            description: template.clone(),
            confidence: 1.0,
            source: EntrySource::Correction,
            model: None,
            pattern_id: None,
            content_hash: hash,
            extraction_method: document.method.as_str().to_string(),
            reasoning: Some("manual rename detected on disk".to_string()),
            outcome: EntryOutcome::Applied,
        })?;
        recorded += 1;
        println!("  recorded");

        let signature = keywords(&full_text, config.learning.max_keywords);
        if signature.len() >= config.learning.min_keywords
            && !store
                .find_candidates(&signature)
                .iter()
                .any(|p| p.template == template)
        {
            store.create(&signature, &template, 1.0)?;
            learned += 1;
            println!("  learned pattern: {}", template);
        }
    }

    println!("scan-corrections");
    println!("  recorded: {}", recorded);
    println!("  patterns learned: {}", learned);
    println!("ok");
    Ok(())
}

/// Current PDF listing for every directory the ledger has touched.
fn snapshot_directories<'a>(paths: impl Iterator<Item = &'a str>) -> DirectoryListing {
    let dirs: BTreeSet<String> = paths
        .filter_map(|p| Path::new(p).parent())
        .map(|d| d.display().to_string())
        .collect();

    let mut listing = BTreeMap::new();
    for dir in dirs {
        let mut names = BTreeSet::new();
        if let Ok(entries) = std::fs::read_dir(&dir) {
            for entry in entries.flatten() {
                if entry.path().is_file() {
                    names.insert(entry.file_name().to_string_lossy().to_string());
                }
            }
        }
        listing.insert(dir, names);
    }
    listing
}

/// Split a user-chosen filename into an optional ISO date prefix and the
/// descriptive remainder used as a pattern template.
fn parse_corrected_name(name: &str) -> (Option<String>, String) {
    let stem = name.strip_suffix(".pdf").unwrap_or(name);

    if stem.len() > 11 && stem.is_char_boundary(10) {
        let (prefix, rest) = stem.split_at(10);
        if chrono::NaiveDate::parse_from_str(prefix, "%Y-%m-%d").is_ok()
            && rest.starts_with('_')
        {
            let rest = rest[1..].strip_prefix("UNDATED_").unwrap_or(&rest[1..]);
            let date = if stem[10..].starts_with("_UNDATED_") {
                None
            } else {
                Some(prefix.to_string())
            };
            return (date, rest.to_string());
        }
    }
    (None, stem.to_string())
}

pub(crate) fn confirm(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}
