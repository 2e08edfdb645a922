//! # Docket Core
//!
//! Shared, I/O-free logic for Docket: data models, text truncation,
//! keyword signatures, pattern matching, the pattern store abstraction,
//! and correction detection.
//!
//! This crate contains no tokio, no filesystem access, and no subprocess
//! or network dependencies. Everything here is deterministic and testable
//! without a real document, an OCR engine, or a naming backend.

pub mod corrections;
pub mod keywords;
pub mod matcher;
pub mod models;
pub mod store;
pub mod truncate;
