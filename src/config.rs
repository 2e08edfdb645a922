use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub data: DataConfig,
    pub extraction: ExtractionConfig,
    pub naming: NamingConfig,
    pub learning: LearningConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    pub dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./data"),
        }
    }
}

impl DataConfig {
    pub fn patterns_path(&self) -> PathBuf {
        self.dir.join("patterns.json")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.join("ledger.jsonl")
    }
}

/// Speed/accuracy trade-off for extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SpeedProfile {
    /// First page only, low render resolution.
    Fast,
    /// First three pages, medium resolution.
    Balanced,
    /// Every page, high resolution.
    Thorough,
}

/// Page limit and OCR render resolution for one speed profile.
#[derive(Debug, Deserialize, Clone)]
pub struct ProfileConfig {
    /// Pages to process; 0 means all pages.
    pub max_pages: usize,
    /// Render resolution for the OCR path, in DPI.
    pub dpi: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Below this many native characters the whole document is treated as
    /// scan-dominant and goes through OCR.
    pub min_text_chars: usize,
    pub ocr_language: String,
    /// Seconds allowed per external OCR/render invocation.
    pub ocr_timeout_secs: u64,
    pub fast: ProfileConfig,
    pub balanced: ProfileConfig,
    pub thorough: ProfileConfig,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_text_chars: 50,
            ocr_language: "eng".to_string(),
            ocr_timeout_secs: 60,
            fast: ProfileConfig {
                max_pages: 1,
                dpi: 150,
            },
            balanced: ProfileConfig {
                max_pages: 3,
                dpi: 200,
            },
            thorough: ProfileConfig {
                max_pages: 0,
                dpi: 300,
            },
        }
    }
}

impl ExtractionConfig {
    pub fn profile(&self, speed: SpeedProfile) -> &ProfileConfig {
        match speed {
            SpeedProfile::Fast => &self.fast,
            SpeedProfile::Balanced => &self.balanced,
            SpeedProfile::Thorough => &self.thorough,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct NamingConfig {
    /// Naming backend: `cli` (subprocess) or `http` (local generate API).
    pub backend: String,
    /// Command to spawn for the `cli` backend.
    pub command: String,
    /// Endpoint for the `http` backend.
    pub endpoint: String,
    pub model: String,
    /// Character budget for document text sent to the namer.
    pub max_context_chars: usize,
    pub timeout_secs: u64,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            backend: "cli".to_string(),
            command: "claude".to_string(),
            endpoint: "http://localhost:11434".to_string(),
            model: "sonnet".to_string(),
            max_context_chars: 50_000,
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LearningConfig {
    /// Minimum decision confidence before a new pattern is created.
    pub create_threshold: f64,
    /// Minimum keyword overlap before a pattern qualifies for reuse.
    pub match_threshold: f64,
    /// Cap on signature size.
    pub max_keywords: usize,
    /// Signatures smaller than this are too thin to learn from.
    pub min_keywords: usize,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            create_threshold: 0.75,
            match_threshold: 0.5,
            max_keywords: 20,
            min_keywords: 3,
        }
    }
}

/// Load configuration from `path`, falling back to defaults when the file
/// does not exist so the tool runs with zero setup.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if !(0.0..=1.0).contains(&config.learning.create_threshold) {
        anyhow::bail!("learning.create_threshold must be in [0.0, 1.0]");
    }

    if !(0.0..=1.0).contains(&config.learning.match_threshold) {
        anyhow::bail!("learning.match_threshold must be in [0.0, 1.0]");
    }

    if config.learning.max_keywords == 0 {
        anyhow::bail!("learning.max_keywords must be > 0");
    }

    if config.naming.max_context_chars < 2_000 {
        anyhow::bail!("naming.max_context_chars must be >= 2000");
    }

    match config.naming.backend.as_str() {
        "cli" | "http" => {}
        other => anyhow::bail!("Unknown naming backend: '{}'. Must be cli or http.", other),
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("docket.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = load_config(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(cfg.learning.create_threshold, 0.75);
        assert_eq!(cfg.naming.backend, "cli");
        assert_eq!(cfg.extraction.balanced.max_pages, 3);
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let (_tmp, path) = write_config(
            r#"
[naming]
backend = "http"
model = "llama3"

[learning]
create_threshold = 0.8
"#,
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.naming.backend, "http");
        assert_eq!(cfg.naming.model, "llama3");
        assert_eq!(cfg.naming.max_context_chars, 50_000);
        assert_eq!(cfg.learning.create_threshold, 0.8);
        assert_eq!(cfg.learning.match_threshold, 0.5);
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let (_tmp, path) = write_config("[learning]\nmatch_threshold = 1.5\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unknown_backend_rejected() {
        let (_tmp, path) = write_config("[naming]\nbackend = \"telepathy\"\n");
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn profile_lookup() {
        let cfg = Config::default();
        assert_eq!(cfg.extraction.profile(SpeedProfile::Fast).max_pages, 1);
        assert_eq!(cfg.extraction.profile(SpeedProfile::Thorough).max_pages, 0);
        assert_eq!(cfg.extraction.profile(SpeedProfile::Thorough).dpi, 300);
    }
}
