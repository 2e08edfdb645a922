//! The `dkt split` command: multi-document scan detection and splitting.
//!
//! Household scanners happily batch several papers into one PDF. The model
//! reads every page and proposes contiguous segments that look like distinct
//! documents; confirmed segments are written out as separate PDFs next to
//! the original, which is left in place.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::config::Config;
use crate::learn_cmd::confirm;
use crate::namer::{clean_filename, create_namer, extract_json, NamingError};
use crate::pipeline::unique_name;

/// Per-page character cap for the boundary prompt. Page identity shows up
/// in headers and openers, so a short slice per page is enough.
const MAX_CHARS_PER_PAGE: usize = 1_500;

const BOUNDARY_PROMPT: &str = "You are sorting a stack of scanned papers. The text of each page of one \
PDF follows. Decide which consecutive pages belong to the same document and \
which are different documents scanned together.\n\n\
Respond with ONLY a JSON object in this exact shape:\n\
{\"documents\": [{\"start_page\": 1, \"end_page\": 2, \"doc_type\": \"Utility Bill\", \
\"suggested_name\": \"electric_bill\", \"confidence\": 0.9}]}\n\n\
Rules:\n\
- page numbers are 1-indexed and each document covers a contiguous range\n\
- group pages sharing a header, sender, or continuing content\n\
- suggested_name: 2-6 lowercase words joined by underscores\n\
- be conservative: only split when the pages are clearly different documents\n\n\
Pages:\n";

/// A contiguous page range believed to be one document. Pages are 0-based
/// and inclusive at both ends.
#[derive(Debug, Clone)]
pub struct Segment {
    pub start_page: usize,
    pub end_page: usize,
    pub doc_type: String,
    pub suggested_name: String,
    pub confidence: f64,
}

impl Segment {
    pub fn page_count(&self) -> usize {
        self.end_page - self.start_page + 1
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start_page == self.end_page {
            write!(f, "page {}: {}", self.start_page + 1, self.suggested_name)?;
        } else {
            write!(
                f,
                "pages {}-{}: {}",
                self.start_page + 1,
                self.end_page + 1,
                self.suggested_name
            )?;
        }
        write!(
            f,
            " ({}, confidence {:.2})",
            self.doc_type, self.confidence
        )
    }
}

pub async fn run_split(
    config: &Config,
    path: &Path,
    model: Option<String>,
    yes: bool,
) -> Result<()> {
    if !path.exists() {
        bail!("file does not exist: {}", path.display());
    }

    let pages = page_texts(path)?;
    if pages.len() <= 1 {
        println!("single page, nothing to split");
        println!("ok");
        return Ok(());
    }

    let mut naming = config.naming.clone();
    if let Some(model) = model {
        naming.model = model;
    }
    let namer = create_namer(&naming);
    if !namer.is_available().await {
        bail!(
            "naming backend '{}' is unavailable; boundary detection needs the model",
            naming.backend
        );
    }

    let prompt = build_boundary_prompt(&pages);
    let raw = namer.complete(&prompt).await?;
    let segments = parse_segments(&raw, pages.len())?;

    if segments.len() <= 1 {
        println!("single document detected, no split needed");
        println!("ok");
        return Ok(());
    }

    println!(
        "detected {} documents in {}",
        segments.len(),
        path.display()
    );
    for segment in &segments {
        println!("  {}", segment);
    }

    if !yes && !confirm("split into these files? [y/N] ")? {
        println!("skipped");
        return Ok(());
    }

    let out_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let created = write_segments(path, &segments, out_dir)?;
    for file in &created {
        println!("  wrote {}", file.display());
    }
    println!("split");
    println!("  documents written: {}", created.len());
    println!("ok");
    Ok(())
}

/// Native text of every page, each capped for the prompt. Empty pages get a
/// placeholder so the model still sees the page positions.
fn page_texts(path: &Path) -> Result<Vec<String>> {
    let pages = pdf_extract::extract_text_by_pages(path)
        .with_context(|| format!("Failed to extract text from {}", path.display()))?;
    Ok(pages
        .into_iter()
        .map(|text| {
            let text = text.trim().to_string();
            if text.is_empty() {
                "[no extractable text]".to_string()
            } else {
                docket_core::truncate::truncate(&text, MAX_CHARS_PER_PAGE)
            }
        })
        .collect())
}

fn build_boundary_prompt(pages: &[String]) -> String {
    let mut prompt = String::from(BOUNDARY_PROMPT);
    for (i, text) in pages.iter().enumerate() {
        prompt.push_str(&format!("\n--- PAGE {} ---\n{}\n", i + 1, text));
    }
    prompt
}

#[derive(Deserialize)]
struct SegmentsResponse {
    documents: Vec<RawSegment>,
}

#[derive(Deserialize)]
struct RawSegment {
    start_page: usize,
    end_page: usize,
    #[serde(default)]
    doc_type: Option<String>,
    #[serde(default)]
    suggested_name: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parse the model's boundary reply into validated segments. Ranges that
/// fall outside the document or run backwards are dropped with a warning
/// rather than failing the whole reply.
fn parse_segments(raw: &str, total_pages: usize) -> Result<Vec<Segment>, NamingError> {
    let candidate = extract_json(raw)
        .ok_or_else(|| NamingError::BadResponse(format!("no JSON object found in: {raw:.200}")))?;

    let response: SegmentsResponse = serde_json::from_str(candidate)
        .map_err(|e| NamingError::BadResponse(format!("invalid JSON: {e}")))?;

    let mut segments = Vec::with_capacity(response.documents.len());
    for doc in response.documents {
        if doc.start_page == 0 || doc.end_page < doc.start_page || doc.end_page > total_pages {
            warn!(
                start = doc.start_page,
                end = doc.end_page,
                total_pages,
                "dropping segment with out-of-range pages"
            );
            continue;
        }
        let suggested = doc
            .suggested_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("document");
        segments.push(Segment {
            start_page: doc.start_page - 1,
            end_page: doc.end_page - 1,
            doc_type: doc.doc_type.unwrap_or_else(|| "unknown".to_string()),
            suggested_name: clean_filename(suggested),
            confidence: doc.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
        });
    }
    debug!(segments = segments.len(), "parsed boundary reply");
    Ok(segments)
}

/// Write one PDF per segment into `out_dir`, never overwriting.
fn write_segments(source: &Path, segments: &[Segment], out_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut created = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        let mut doc = lopdf::Document::load(source)
            .with_context(|| format!("Failed to open PDF: {}", source.display()))?;
        let total = doc.get_pages().len() as u32;
        let keep = (segment.start_page as u32 + 1)..=(segment.end_page as u32 + 1);
        let drop: Vec<u32> = (1..=total).filter(|p| !keep.contains(p)).collect();
        if !drop.is_empty() {
            doc.delete_pages(&drop);
        }
        doc.prune_objects();

        let base = format!("split_{}_{}.pdf", i + 1, segment.suggested_name);
        let target = out_dir.join(unique_name(out_dir, &base));
        doc.save(&target)
            .with_context(|| format!("Failed to write {}", target.display()))?;
        created.push(target);
    }
    Ok(created)
}
