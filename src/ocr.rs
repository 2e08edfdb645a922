//! OCR support for scan-dominant PDFs.
//!
//! Pages are rasterized with `pdftoppm` and recognized with `tesseract`, both
//! invoked as external commands with a timeout. Neither tool is required for
//! native-text documents; callers probe [`OcrEngine::is_available`] and degrade
//! gracefully when the tools are missing.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR tooling unavailable: {0}")]
    Unavailable(String),
    #[error("failed to render page {page}: {detail}")]
    Render { page: usize, detail: String },
    #[error("text recognition failed on page {page}: {detail}")]
    Recognition { page: usize, detail: String },
    #[error("OCR timed out after {0}s")]
    Timeout(u64),
}

/// A page-at-a-time OCR backend.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Whether the backend's external tooling is present.
    async fn is_available(&self) -> bool;

    /// Rasterize and recognize a single page (1-based) of `pdf`.
    async fn recognize_page(&self, pdf: &Path, page: usize, dpi: u32)
        -> Result<String, OcrError>;
}

/// OCR via the poppler + tesseract command line tools.
pub struct TesseractCli {
    render_cmd: String,
    ocr_cmd: String,
    language: String,
    timeout: Duration,
}

impl TesseractCli {
    pub fn new(language: &str, timeout_secs: u64) -> Self {
        Self {
            render_cmd: "pdftoppm".to_string(),
            ocr_cmd: "tesseract".to_string(),
            language: language.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    #[cfg(test)]
    fn with_commands(render_cmd: &str, ocr_cmd: &str) -> Self {
        Self {
            render_cmd: render_cmd.to_string(),
            ocr_cmd: ocr_cmd.to_string(),
            language: "eng".to_string(),
            timeout: Duration::from_secs(5),
        }
    }

    async fn render_page(
        &self,
        pdf: &Path,
        page: usize,
        dpi: u32,
        out_dir: &Path,
    ) -> Result<PathBuf, OcrError> {
        let prefix = out_dir.join("page");
        // -singlefile keeps the output name deterministic (no page-number
        // zero padding to guess at).
        let output = Command::new(&self.render_cmd)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(page.to_string())
            .arg("-l")
            .arg(page.to_string())
            .arg("-singlefile")
            .arg(pdf)
            .arg(&prefix)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| OcrError::Render {
                page,
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::Render {
                page,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let image = prefix.with_extension("png");
        if !image.exists() {
            return Err(OcrError::Render {
                page,
                detail: "renderer produced no output image".to_string(),
            });
        }
        Ok(image)
    }
}

#[async_trait]
impl OcrEngine for TesseractCli {
    async fn is_available(&self) -> bool {
        let render_ok = Command::new(&self.render_cmd)
            .arg("-v")
            .output()
            .await
            .is_ok();
        let ocr_ok = Command::new(&self.ocr_cmd)
            .arg("--version")
            .output()
            .await
            .is_ok();
        render_ok && ocr_ok
    }

    async fn recognize_page(
        &self,
        pdf: &Path,
        page: usize,
        dpi: u32,
    ) -> Result<String, OcrError> {
        let tmp = tempfile::tempdir().map_err(|e| OcrError::Render {
            page,
            detail: e.to_string(),
        })?;
        let image = self.render_page(pdf, page, dpi, tmp.path()).await?;

        let output = Command::new(&self.ocr_cmd)
            .arg(&image)
            .arg("stdout")
            .arg("-l")
            .arg(&self.language)
            .output();

        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| OcrError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| OcrError::Recognition {
                page,
                detail: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::Recognition {
                page,
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
