//! # Docket
//!
//! A local-first PDF naming pipeline with learned patterns.
//!
//! Docket reads each PDF's content (native text when present, OCR for
//! scans), derives a date and a short description, renames the file to
//! `YYYY-MM-DD_description.pdf`, and appends the decision to a ledger.
//! Confident decisions are distilled into keyword patterns so recurring
//! document types are named without another model call, and manual renames
//! feed back into the same store as corrections.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌─────────────────────────┐
//! │   PDFs   │──▶│  Extract  │──▶│    Naming decision      │
//! │ (in dir) │   │ native/OCR│   │ correction > pattern >  │
//! └──────────┘   └───────────┘   │        model            │
//!                                └─────┬──────────┬────────┘
//!                                      ▼          ▼
//!                               ┌───────────┐ ┌──────────┐
//!                               │  ledger   │ │ patterns │
//!                               │  .jsonl   │ │  .json   │
//!                               └───────────┘ └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! dkt process ~/scans --dry-run    # preview
//! dkt process ~/scans              # rename for real
//! dkt history --limit 10           # recent decisions
//! dkt learn --stats                # learned patterns
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration with built-in defaults |
//! | [`extract`] | Hybrid native/OCR text extraction |
//! | [`ocr`] | pdftoppm + tesseract page recognition |
//! | [`namer`] | Model-backed naming (CLI or HTTP backend) |
//! | [`pattern_store`] | JSON-persisted learned patterns |
//! | [`ledger`] | Append-only JSONL decision history |
//! | [`pipeline`] | Batch orchestration for `dkt process` |
//! | [`split`] | Multi-document scan detection and splitting |
//!
//! Pure, I/O-free logic (signatures, matching, truncation, correction
//! detection) lives in the `docket-core` crate.

pub mod config;
pub mod extract;
pub mod history;
pub mod info;
pub mod learn_cmd;
pub mod ledger;
pub mod namer;
pub mod ocr;
pub mod pattern_store;
pub mod pipeline;
pub mod split;
