//! Batch processing orchestration.
//!
//! Coordinates the full flow for a directory of PDFs: extraction → identity
//! hash → correction lookup → pattern match → AI naming → rename → ledger.
//! Documents are processed one at a time; a failure on one document never
//! aborts the batch.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use docket_core::keywords::keywords;
use docket_core::matcher::best_match;
use docket_core::models::{content_hash, EntryOutcome, EntrySource, LedgerEntry, Signature};
use docket_core::store::memory::MemoryPatternStore;
use docket_core::store::PatternStore;

use crate::config::{Config, SpeedProfile};
use crate::extract::{self, DocumentText};
use crate::ledger::Ledger;
use crate::namer::{create_namer, Namer};
use crate::ocr::TesseractCli;
use crate::pattern_store::JsonPatternStore;

pub struct ProcessOptions {
    pub input: PathBuf,
    pub recursive: bool,
    pub dry_run: bool,
    pub force: bool,
    pub speed: SpeedProfile,
    pub limit: Option<usize>,
    /// Bypass the pattern store entirely: no matching, no learning.
    pub no_patterns: bool,
    /// Override the configured namer model for this run.
    pub model: Option<String>,
}

#[derive(Debug, Default)]
pub struct ProcessReport {
    pub found: usize,
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub from_correction: usize,
    pub from_pattern: usize,
    pub from_ai: usize,
    pub patterns_created: usize,
}

/// How a document's new name was decided.
enum Decision {
    Correction {
        new_name: String,
        date: Option<String>,
        description: String,
    },
    Pattern {
        pattern_id: String,
        template: String,
        score: f64,
    },
    Ai(crate::namer::NameSuggestion),
}

pub async fn run_process(config: &Config, opts: &ProcessOptions) -> Result<ProcessReport> {
    let mut report = ProcessReport::default();

    let mut documents = find_pdfs(&opts.input, opts.recursive)?;
    if let Some(limit) = opts.limit {
        documents.truncate(limit);
    }
    report.found = documents.len();

    if documents.is_empty() {
        println!("process {}", opts.input.display());
        println!("  documents found: 0");
        println!("ok");
        return Ok(report);
    }

    // Learning is an optimization: a corrupt store degrades to a volatile
    // one so the batch still runs, it just won't remember.
    let mut store: Box<dyn PatternStore> =
        match JsonPatternStore::open(&config.data.patterns_path()) {
            Ok(store) => Box::new(store),
            Err(e) => {
                warn!(error = %e, "pattern store unreadable, continuing without persistence");
                Box::new(MemoryPatternStore::new())
            }
        };

    let mut ledger = Ledger::open(&config.data.ledger_path())?;

    let ocr = TesseractCli::new(
        &config.extraction.ocr_language,
        config.extraction.ocr_timeout_secs,
    );
    let mut naming = config.naming.clone();
    if let Some(model) = &opts.model {
        naming.model = model.clone();
    }
    let namer = create_namer(&naming);
    let namer_available = namer.is_available().await;
    if !namer_available {
        warn!(
            backend = %config.naming.backend,
            "naming backend unavailable; only corrections and learned patterns will apply"
        );
    }

    for path in &documents {
        match process_one(
            config,
            opts,
            path,
            &ocr,
            namer.as_ref(),
            namer_available,
            store.as_mut(),
            &mut ledger,
            &mut report,
        )
        .await
        {
            Ok(()) => {}
            Err(e) => {
                warn!(path = %path.display(), error = %e, "document failed");
                println!("  FAILED {}: {}", path.display(), e);
                report.failed += 1;
            }
        }
    }

    println!(
        "process {}{}",
        opts.input.display(),
        if opts.dry_run { " (dry-run)" } else { "" }
    );
    println!("  documents found: {}", report.found);
    println!("  renamed: {}", report.renamed);
    println!("  skipped: {}", report.skipped);
    println!("  failed: {}", report.failed);
    println!("  from corrections: {}", report.from_correction);
    println!("  from patterns: {}", report.from_pattern);
    println!("  from ai: {}", report.from_ai);
    println!("  patterns created: {}", report.patterns_created);
    println!("ok");

    Ok(report)
}

#[allow(clippy::too_many_arguments)]
async fn process_one(
    config: &Config,
    opts: &ProcessOptions,
    path: &Path,
    ocr: &TesseractCli,
    namer: &dyn Namer,
    namer_available: bool,
    store: &mut dyn PatternStore,
    ledger: &mut Ledger,
    report: &mut ProcessReport,
) -> Result<()> {
    let original_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let document = extract::extract(path, &config.extraction, opts.speed, ocr).await?;
    let full_text = document.full_text();
    let hash = content_hash(&full_text);

    if !opts.force && ledger.already_processed(&hash) {
        info!(path = %path.display(), "already processed, skipping");
        println!("  skip {} (already processed)", original_name);
        report.skipped += 1;
        return Ok(());
    }

    let signature = keywords(&full_text, config.learning.max_keywords);
    let decision = decide(
        config,
        &hash,
        &signature,
        namer,
        namer_available,
        opts.no_patterns,
        store,
        ledger,
        &full_text,
    )
    .await?;

    let (target_name, date, description, confidence, source, model, pattern_id, reasoning) =
        match &decision {
            Decision::Correction {
                new_name,
                date,
                description,
            } => (
                new_name.clone(),
                date.clone(),
                description.clone(),
                1.0,
                EntrySource::Correction,
                None,
                None,
                Some("reused earlier manual correction".to_string()),
            ),
            Decision::Pattern {
                pattern_id,
                template,
                score,
            } => (
                format!("{}_{}.pdf", Utc::now().format("%Y-%m-%d"), template),
                None,
                template.clone(),
                *score,
                EntrySource::Pattern,
                None,
                Some(pattern_id.clone()),
                None,
            ),
            Decision::Ai(suggestion) => (
                suggestion.filename(),
                suggestion.date.clone(),
                suggestion.description.clone(),
                suggestion.confidence,
                EntrySource::Ai,
                Some(namer.model().to_string()),
                None,
                suggestion.reasoning.clone(),
            ),
        };

    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    if target_name == original_name {
        println!("  skip {} (already named)", original_name);
        report.skipped += 1;
        record(
            ledger,
            path,
            &original_name,
            &target_name,
            date,
            &description,
            confidence,
            source,
            model,
            pattern_id,
            &hash,
            &document,
            reasoning,
            EntryOutcome::Skipped,
        )?;
        return Ok(());
    }

    let target_name = unique_name(parent, &target_name);
    let outcome = if opts.dry_run {
        println!("  would rename {} -> {}", original_name, target_name);
        EntryOutcome::DryRun
    } else {
        std::fs::rename(path, parent.join(&target_name))
            .with_context(|| format!("Failed to rename {}", path.display()))?;
        println!("  rename {} -> {}", original_name, target_name);
        EntryOutcome::Applied
    };

    if outcome == EntryOutcome::Applied {
        match &decision {
            Decision::Correction { .. } => report.from_correction += 1,
            Decision::Pattern {
                pattern_id, score, ..
            } => {
                store.record_use(pattern_id, *score)?;
                report.from_pattern += 1;
            }
            Decision::Ai(suggestion) => {
                report.from_ai += 1;
                if !opts.no_patterns
                    && should_learn(config, &signature, suggestion.confidence)
                    && !template_exists(store, &signature, &description)
                {
                    store.create(&signature, &description, suggestion.confidence)?;
                    report.patterns_created += 1;
                    info!(template = %description, "learned new pattern");
                }
            }
        }
        report.renamed += 1;
    } else {
        report.renamed += 1; // would-rename counts toward the dry-run total
    }

    record(
        ledger,
        path,
        &original_name,
        &target_name,
        date,
        &description,
        confidence,
        source,
        model,
        pattern_id,
        &hash,
        &document,
        reasoning,
        outcome,
    )?;

    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn decide(
    config: &Config,
    hash: &str,
    signature: &Signature,
    namer: &dyn Namer,
    namer_available: bool,
    no_patterns: bool,
    store: &mut dyn PatternStore,
    ledger: &Ledger,
    full_text: &str,
) -> Result<Decision> {
    // A user correction for identical content outranks everything.
    if let Some(correction) = ledger.find_correction_by_hash(hash) {
        return Ok(Decision::Correction {
            new_name: correction.new_name.clone(),
            date: correction.date.clone(),
            description: correction.description.clone(),
        });
    }

    if !no_patterns {
        let candidates = store.find_candidates(signature);
        if let Some(hit) = best_match(signature, &candidates, config.learning.match_threshold) {
            return Ok(Decision::Pattern {
                pattern_id: hit.pattern.id.clone(),
                template: hit.pattern.template.clone(),
                score: hit.score,
            });
        }
    }

    if !namer_available {
        anyhow::bail!("no correction or pattern applies and the naming backend is unavailable");
    }

    let suggestion = namer.suggest(full_text).await?;
    Ok(Decision::Ai(suggestion))
}

fn should_learn(config: &Config, signature: &Signature, confidence: f64) -> bool {
    confidence >= config.learning.create_threshold
        && signature.len() >= config.learning.min_keywords
}

fn template_exists(store: &dyn PatternStore, signature: &Signature, template: &str) -> bool {
    store
        .find_candidates(signature)
        .iter()
        .any(|p| p.template == template)
}

#[allow(clippy::too_many_arguments)]
fn record(
    ledger: &mut Ledger,
    path: &Path,
    original_name: &str,
    new_name: &str,
    date: Option<String>,
    description: &str,
    confidence: f64,
    source: EntrySource,
    model: Option<String>,
    pattern_id: Option<String>,
    hash: &str,
    document: &DocumentText,
    reasoning: Option<String>,
    outcome: EntryOutcome,
) -> Result<()> {
    ledger.append(LedgerEntry {
        timestamp: Utc::now(),
        original_path: path.display().to_string(),
        original_name: original_name.to_string(),
        new_name: new_name.to_string(),
        date,
        description: description.to_string(),
        confidence,
        source,
        model,
        pattern_id,
        content_hash: hash.to_string(),
        extraction_method: document.method.as_str().to_string(),
        reasoning,
        outcome,
    })?;
    Ok(())
}

/// Find PDFs under `input`, sorted for a deterministic processing order.
pub fn find_pdfs(input: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("input path does not exist: {}", input.display());
    }

    let mut paths = Vec::new();
    if recursive {
        for entry in WalkDir::new(input).follow_links(false) {
            let entry = entry?;
            if entry.file_type().is_file() && is_pdf(entry.path()) {
                paths.push(entry.path().to_path_buf());
            }
        }
    } else {
        for entry in std::fs::read_dir(input)
            .with_context(|| format!("Failed to read directory: {}", input.display()))?
        {
            let entry = entry?;
            let path = entry.path();
            if path.is_file() && is_pdf(&path) {
                paths.push(path);
            }
        }
    }
    paths.sort();
    Ok(paths)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .map(|e| e.eq_ignore_ascii_case("pdf"))
        .unwrap_or(false)
}

/// First free variant of `name` in `dir`: `name.pdf`, `name_1.pdf`, ...
pub(crate) fn unique_name(dir: &Path, name: &str) -> String {
    if !dir.join(name).exists() {
        return name.to_string();
    }
    let stem = name.strip_suffix(".pdf").unwrap_or(name);
    for i in 1.. {
        let candidate = format!("{}_{}.pdf", stem, i);
        if !dir.join(&candidate).exists() {
            return candidate;
        }
    }
    unreachable!()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_pdfs_filters_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("b.pdf"), b"x").unwrap();
        std::fs::write(tmp.path().join("a.PDF"), b"x").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(tmp.path().join("sub")).unwrap();
        std::fs::write(tmp.path().join("sub/c.pdf"), b"x").unwrap();

        let flat = find_pdfs(tmp.path(), false).unwrap();
        let names: Vec<_> = flat
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);

        let deep = find_pdfs(tmp.path(), true).unwrap();
        assert_eq!(deep.len(), 3);
    }

    #[test]
    fn find_pdfs_accepts_single_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("one.pdf");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(find_pdfs(&file, false).unwrap(), vec![file]);
    }

    #[test]
    fn find_pdfs_rejects_missing_path() {
        assert!(find_pdfs(Path::new("/no/such/dir"), false).is_err());
    }

    #[test]
    fn unique_name_suffixes_on_collision() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(unique_name(tmp.path(), "report.pdf"), "report.pdf");

        std::fs::write(tmp.path().join("report.pdf"), b"x").unwrap();
        assert_eq!(unique_name(tmp.path(), "report.pdf"), "report_1.pdf");

        std::fs::write(tmp.path().join("report_1.pdf"), b"x").unwrap();
        assert_eq!(unique_name(tmp.path(), "report.pdf"), "report_2.pdf");
    }

    #[test]
    fn learning_gate_requires_confidence_and_signature_depth() {
        let config = Config::default();
        let rich = keywords("invoice acme electric utility billing statement", 20);
        let thin = keywords("invoice acme", 20);

        assert!(should_learn(&config, &rich, 0.9));
        assert!(!should_learn(&config, &rich, 0.5));
        assert!(!should_learn(&config, &thin, 0.9));
    }
}
