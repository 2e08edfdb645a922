//! Document naming backends.
//!
//! A [`Namer`] turns extracted document text into a structured naming
//! decision: a document date, a short description, and the model's confidence
//! in both. Two backends are supported, selected by `naming.backend`:
//!
//! - `cli`: spawn a local assistant CLI and pipe the prompt over stdin
//! - `http`: POST to a local generate endpoint (Ollama-style API)

use crate::config::NamingConfig;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Characters reserved for the prompt scaffolding around document text.
const PROMPT_RESERVE: usize = 1_000;

const NAMING_PROMPT: &str = "You are a document archivist. Read the document text below and respond \
with ONLY a JSON object, no other text, in this exact shape:\n\
{\"date\": \"YYYY-MM-DD or null\", \"description\": \"short_snake_case_description\", \
\"confidence\": 0.0, \"reasoning\": \"one sentence\"}\n\n\
Rules:\n\
- date: the date the document itself was issued, in ISO format. Use null when no \
issue date appears in the text. Never invent one.\n\
- description: 2-6 lowercase words joined by underscores naming the document's \
identity (issuer and kind), e.g. acme_invoice or county_tax_assessment.\n\
- confidence: how certain you are of BOTH fields together, from 0.0 to 1.0.\n\
- reasoning: one short sentence.\n\n\
Document text:\n";

#[derive(Debug, Error)]
pub enum NamingError {
    #[error("naming backend unavailable: {0}")]
    Unavailable(String),
    #[error("naming timed out after {0}s")]
    Timeout(u64),
    #[error("unusable response from naming backend: {0}")]
    BadResponse(String),
}

/// A naming decision from a model.
#[derive(Debug, Clone, Deserialize)]
pub struct NameSuggestion {
    /// ISO document date, absent when the text carries none.
    pub date: Option<String>,
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub reasoning: Option<String>,
}

impl NameSuggestion {
    /// Target filename for this suggestion. Undated documents get today's
    /// date and an explicit UNDATED marker so they stay sortable without
    /// pretending to a date the document never carried.
    pub fn filename(&self) -> String {
        let description = clean_filename(&self.description);
        match &self.date {
            Some(date) => format!("{}_{}.pdf", date, description),
            None => format!(
                "{}_UNDATED_{}.pdf",
                Utc::now().format("%Y-%m-%d"),
                description
            ),
        }
    }
}

#[async_trait]
pub trait Namer: Send + Sync {
    /// Whether the backend can currently serve requests.
    async fn is_available(&self) -> bool;

    /// Send a fully built prompt and return the raw model reply.
    async fn complete(&self, prompt: &str) -> Result<String, NamingError>;

    /// Suggest a name for a document from its (already truncated) text.
    async fn suggest(&self, text: &str) -> Result<NameSuggestion, NamingError>;

    fn model(&self) -> &str;
}

/// Construct the configured naming backend.
pub fn create_namer(config: &NamingConfig) -> Box<dyn Namer> {
    match config.backend.as_str() {
        "http" => Box::new(HttpNamer::new(config)),
        _ => Box::new(CliNamer::new(config)),
    }
}

fn build_prompt(text: &str, max_context_chars: usize) -> String {
    let budget = max_context_chars.saturating_sub(PROMPT_RESERVE);
    let body = docket_core::truncate::truncate(text, budget);
    format!("{}{}", NAMING_PROMPT, body)
}

/// Strip filesystem-hostile characters and collapse runs of underscores.
pub fn clean_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;
    for c in name.trim().chars() {
        let mapped = match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => None,
            c if c.is_whitespace() => Some('_'),
            c => Some(c),
        };
        if let Some(c) = mapped {
            if c == '_' {
                if !last_underscore && !out.is_empty() {
                    out.push('_');
                }
                last_underscore = true;
            } else {
                out.push(c);
                last_underscore = false;
            }
        }
    }
    let out = out.trim_matches('_').to_string();
    if out.is_empty() {
        "document".to_string()
    } else {
        out
    }
}

fn is_iso_date(s: &str) -> bool {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok()
}

/// Parse a model response into a suggestion. Models are asked for bare JSON
/// but fenced or prose-wrapped replies show up often enough to handle.
fn parse_response(raw: &str) -> Result<NameSuggestion, NamingError> {
    let candidate = extract_json(raw)
        .ok_or_else(|| NamingError::BadResponse(format!("no JSON object found in: {raw:.200}")))?;

    let mut suggestion: NameSuggestion = serde_json::from_str(candidate)
        .map_err(|e| NamingError::BadResponse(format!("invalid JSON: {e}")))?;

    if suggestion.description.trim().is_empty() {
        return Err(NamingError::BadResponse("empty description".to_string()));
    }
    if !suggestion.confidence.is_finite() {
        return Err(NamingError::BadResponse(
            "non-finite confidence".to_string(),
        ));
    }
    suggestion.confidence = suggestion.confidence.clamp(0.0, 1.0);

    // A malformed date is worse than no date.
    if let Some(date) = &suggestion.date {
        if date.eq_ignore_ascii_case("null") || !is_iso_date(date) {
            suggestion.date = None;
        }
    }

    Ok(suggestion)
}

/// Locate the JSON payload in a raw model reply: the whole string, a fenced
/// block, or the outermost brace span, tried in that order.
pub(crate) fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    if trimmed.starts_with('{') && trimmed.ends_with('}') {
        return Some(trimmed);
    }
    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        let after = after.strip_prefix("json").unwrap_or(after);
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return Some(inner);
            }
        }
    }
    let start = trimmed.find('{')?;
    let end = trimmed.rfind('}')?;
    if end > start {
        Some(&trimmed[start..=end])
    } else {
        None
    }
}

/// Naming via a locally installed assistant CLI, prompt over stdin.
pub struct CliNamer {
    command: String,
    model: String,
    max_context_chars: usize,
    timeout: Duration,
}

impl CliNamer {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            command: config.command.clone(),
            model: config.model.clone(),
            max_context_chars: config.max_context_chars,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Namer for CliNamer {
    async fn is_available(&self) -> bool {
        Command::new(&self.command)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn complete(&self, prompt: &str) -> Result<String, NamingError> {
        let mut child = Command::new(&self.command)
            .arg("--print")
            .arg("--model")
            .arg(&self.model)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| NamingError::Unavailable(format!("{}: {}", self.command, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| NamingError::Unavailable("no stdin handle".to_string()))?;
        stdin
            .write_all(prompt.as_bytes())
            .await
            .map_err(|e| NamingError::Unavailable(e.to_string()))?;
        drop(stdin);

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| NamingError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| NamingError::Unavailable(e.to_string()))?;

        if !output.status.success() {
            return Err(NamingError::BadResponse(format!(
                "{} exited with {}: {}",
                self.command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let raw = String::from_utf8_lossy(&output.stdout).into_owned();
        debug!(model = %self.model, bytes = raw.len(), "cli namer responded");
        Ok(raw)
    }

    async fn suggest(&self, text: &str) -> Result<NameSuggestion, NamingError> {
        let raw = self
            .complete(&build_prompt(text, self.max_context_chars))
            .await?;
        parse_response(&raw)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Naming via a local generate endpoint speaking the Ollama API.
pub struct HttpNamer {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    max_context_chars: usize,
    timeout: Duration,
}

impl HttpNamer {
    pub fn new(config: &NamingConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_context_chars: config.max_context_chars,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl Namer for HttpNamer {
    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/api/tags", self.endpoint))
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    async fn complete(&self, prompt: &str) -> Result<String, NamingError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.endpoint))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NamingError::Timeout(self.timeout.as_secs())
                } else {
                    NamingError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            return Err(NamingError::BadResponse(format!(
                "generate endpoint returned {}",
                response.status()
            )));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| NamingError::BadResponse(e.to_string()))?;

        debug!(model = %self.model, bytes = body.response.len(), "http namer responded");
        Ok(body.response)
    }

    async fn suggest(&self, text: &str) -> Result<NameSuggestion, NamingError> {
        let raw = self
            .complete(&build_prompt(text, self.max_context_chars))
            .await?;
        parse_response(&raw)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_json() {
        let s = parse_response(
            r#"{"date": "2024-03-15", "description": "acme_invoice", "confidence": 0.9, "reasoning": "invoice header"}"#,
        )
        .unwrap();
        assert_eq!(s.date.as_deref(), Some("2024-03-15"));
        assert_eq!(s.description, "acme_invoice");
        assert_eq!(s.confidence, 0.9);
    }

    #[test]
    fn parses_fenced_json() {
        let raw = "Here you go:\n```json\n{\"date\": null, \"description\": \"bank_statement\", \"confidence\": 0.7}\n```";
        let s = parse_response(raw).unwrap();
        assert!(s.date.is_none());
        assert_eq!(s.description, "bank_statement");
    }

    #[test]
    fn parses_prose_wrapped_json() {
        let raw = "Sure. {\"date\": \"2023-01-02\", \"description\": \"lease_agreement\", \"confidence\": 0.85} Hope that helps.";
        let s = parse_response(raw).unwrap();
        assert_eq!(s.date.as_deref(), Some("2023-01-02"));
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_response("I could not determine a name."),
            Err(NamingError::BadResponse(_))
        ));
    }

    #[test]
    fn rejects_empty_description() {
        let raw = r#"{"date": null, "description": "  ", "confidence": 0.5}"#;
        assert!(parse_response(raw).is_err());
    }

    #[test]
    fn invalid_date_degrades_to_undated() {
        let raw = r#"{"date": "sometime in March", "description": "memo", "confidence": 0.6}"#;
        let s = parse_response(raw).unwrap();
        assert!(s.date.is_none());
    }

    #[test]
    fn confidence_is_clamped() {
        let raw = r#"{"date": null, "description": "memo", "confidence": 1.7}"#;
        assert_eq!(parse_response(raw).unwrap().confidence, 1.0);
    }

    #[test]
    fn filename_with_date() {
        let s = NameSuggestion {
            date: Some("2024-03-15".to_string()),
            description: "acme_invoice".to_string(),
            confidence: 0.9,
            reasoning: None,
        };
        assert_eq!(s.filename(), "2024-03-15_acme_invoice.pdf");
    }

    #[test]
    fn filename_without_date_marks_undated() {
        let s = NameSuggestion {
            date: None,
            description: "mystery_memo".to_string(),
            confidence: 0.4,
            reasoning: None,
        };
        let name = s.filename();
        assert!(name.contains("_UNDATED_mystery_memo.pdf"), "{name}");
    }

    #[test]
    fn clean_filename_strips_hostile_chars() {
        assert_eq!(clean_filename("a/b\\c: d?*"), "abc_d");
        assert_eq!(clean_filename("  spaced  out  "), "spaced_out");
        assert_eq!(clean_filename("___"), "document");
        assert_eq!(clean_filename("<>:\"|"), "document");
    }

    #[test]
    fn prompt_respects_context_budget() {
        let text = "word ".repeat(20_000);
        let prompt = build_prompt(&text, 10_000);
        assert!(prompt.chars().count() <= 10_000 + NAMING_PROMPT.chars().count());
        assert!(prompt.starts_with(NAMING_PROMPT));
    }

    #[test]
    fn iso_date_check() {
        assert!(is_iso_date("2024-02-29"));
        assert!(!is_iso_date("2023-02-29"));
        assert!(!is_iso_date("15/03/2024"));
    }
}
