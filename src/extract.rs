//! Hybrid text extraction for PDFs.
//!
//! Native text is pulled first; when the document as a whole carries fewer
//! than `min_text_chars` native characters it is treated as scan-dominant and
//! the processed pages are re-read through OCR instead. The decision is made
//! once per document, never per page.

use crate::config::{ExtractionConfig, SpeedProfile};
use crate::ocr::{OcrEngine, OcrError};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("unreadable PDF: {0}")]
    Unreadable(String),
    #[error("no text recovered from document")]
    Empty,
    #[error(transparent)]
    Ocr(#[from] OcrError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    Native,
    Ocr,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExtractionMethod::Native => "native",
            ExtractionMethod::Ocr => "ocr",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: usize,
    pub text: String,
}

/// Extracted text for one document, with provenance.
#[derive(Debug, Clone)]
pub struct DocumentText {
    pub pages: Vec<PageText>,
    pub method: ExtractionMethod,
    pub pages_processed: usize,
    pub total_pages: usize,
}

impl DocumentText {
    /// All page text joined with page markers, in page order.
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| format!("--- Page {} ---\n{}", p.number, p.text))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn char_count(&self) -> usize {
        self.pages.iter().map(|p| p.text.chars().count()).sum()
    }
}

/// Number of pages to process under `max_pages` (0 means all).
fn effective_limit(total_pages: usize, max_pages: usize) -> usize {
    if max_pages == 0 {
        total_pages
    } else {
        total_pages.min(max_pages)
    }
}

/// Extract text from `path` at the given speed profile.
pub async fn extract(
    path: &Path,
    config: &ExtractionConfig,
    speed: SpeedProfile,
    ocr: &dyn OcrEngine,
) -> Result<DocumentText, ExtractionError> {
    let doc =
        lopdf::Document::load(path).map_err(|e| ExtractionError::Unreadable(e.to_string()))?;
    let total_pages = doc.get_pages().len();
    if total_pages == 0 {
        return Err(ExtractionError::Empty);
    }
    drop(doc);

    let profile = config.profile(speed);
    let limit = effective_limit(total_pages, profile.max_pages);

    let native_pages = pdf_extract::extract_text_by_pages(path)
        .map_err(|e| ExtractionError::Unreadable(e.to_string()))?;

    let pages: Vec<PageText> = native_pages
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, text)| PageText {
            number: i + 1,
            text: text.trim().to_string(),
        })
        .collect();

    let native_chars: usize = pages.iter().map(|p| p.text.chars().count()).sum();

    if native_chars >= config.min_text_chars {
        debug!(
            path = %path.display(),
            pages = limit,
            chars = native_chars,
            "native extraction sufficient"
        );
        return Ok(DocumentText {
            pages,
            method: ExtractionMethod::Native,
            pages_processed: limit,
            total_pages,
        });
    }

    debug!(
        path = %path.display(),
        chars = native_chars,
        threshold = config.min_text_chars,
        "scan-dominant document, switching to OCR"
    );

    match ocr_pages(path, limit, profile.dpi, ocr).await {
        Ok(ocr_result) => {
            if ocr_result.iter().all(|p| p.text.is_empty()) {
                if native_chars == 0 {
                    return Err(ExtractionError::Empty);
                }
                warn!(path = %path.display(), "OCR recovered nothing, keeping sparse native text");
                return Ok(DocumentText {
                    pages,
                    method: ExtractionMethod::Native,
                    pages_processed: limit,
                    total_pages,
                });
            }
            Ok(DocumentText {
                pages: ocr_result,
                method: ExtractionMethod::Ocr,
                pages_processed: limit,
                total_pages,
            })
        }
        Err(e) if native_chars > 0 => {
            // Thin native text beats nothing at all.
            warn!(path = %path.display(), error = %e, "OCR failed, keeping sparse native text");
            Ok(DocumentText {
                pages,
                method: ExtractionMethod::Native,
                pages_processed: limit,
                total_pages,
            })
        }
        Err(e) => Err(e.into()),
    }
}

async fn ocr_pages(
    path: &Path,
    limit: usize,
    dpi: u32,
    ocr: &dyn OcrEngine,
) -> Result<Vec<PageText>, OcrError> {
    if !ocr.is_available().await {
        return Err(OcrError::Unavailable(
            "pdftoppm and tesseract are required for scanned PDFs".to_string(),
        ));
    }
    let mut pages = Vec::with_capacity(limit);
    for number in 1..=limit {
        let text = ocr.recognize_page(path, number, dpi).await?;
        pages.push(PageText { number, text });
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpeedProfile;
    use crate::ocr::TesseractCli;

    #[test]
    fn effective_limit_honors_zero_as_all() {
        assert_eq!(effective_limit(12, 0), 12);
        assert_eq!(effective_limit(12, 3), 3);
        assert_eq!(effective_limit(2, 3), 2);
    }

    #[test]
    fn full_text_joins_pages_in_order() {
        let doc = DocumentText {
            pages: vec![
                PageText {
                    number: 1,
                    text: "alpha".to_string(),
                },
                PageText {
                    number: 2,
                    text: "beta".to_string(),
                },
            ],
            method: ExtractionMethod::Native,
            pages_processed: 2,
            total_pages: 2,
        };
        let text = doc.full_text();
        assert!(text.starts_with("--- Page 1 ---\nalpha"));
        assert!(text.contains("--- Page 2 ---\nbeta"));
        assert!(text.find("alpha").unwrap() < text.find("beta").unwrap());
    }

    #[test]
    fn method_labels() {
        assert_eq!(ExtractionMethod::Native.as_str(), "native");
        assert_eq!(ExtractionMethod::Ocr.as_str(), "ocr");
    }

    #[tokio::test]
    async fn unreadable_file_is_an_extraction_error() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("not-a-pdf.pdf");
        std::fs::write(&path, b"plain text, not a pdf").unwrap();
        let engine = TesseractCli::new("eng", 5);
        let err = extract(
            &path,
            &ExtractionConfig::default(),
            SpeedProfile::Fast,
            &engine,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ExtractionError::Unreadable(_)));
    }
}
