//! The `dkt info` command: inspect a PDF without renaming it.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::ledger::Ledger;

pub fn run_info(config: &Config, path: &Path) -> Result<()> {
    let doc = lopdf::Document::load(path)
        .with_context(|| format!("Failed to open PDF: {}", path.display()))?;

    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);

    println!("info {}", path.display());
    println!("  pages: {}", doc.get_pages().len());
    println!("  size: {} bytes", size);

    for (label, key) in [
        ("title", b"Title".as_slice()),
        ("author", b"Author".as_slice()),
        ("creator", b"Creator".as_slice()),
        ("producer", b"Producer".as_slice()),
        ("created", b"CreationDate".as_slice()),
    ] {
        if let Some(value) = info_field(&doc, key) {
            println!("  {}: {}", label, value);
        }
    }

    let ledger = Ledger::open(&config.data.ledger_path())?;
    if let Some(entry) = ledger.find_by_path(&path.display().to_string()) {
        println!("  ledger: {} ({}, confidence {:.2})",
            entry.new_name,
            entry.source.as_str(),
            entry.confidence,
        );
    } else {
        println!("  ledger: no entry");
    }
    println!("ok");
    Ok(())
}

/// Read one entry from the document's Info dictionary, if present.
fn info_field(doc: &lopdf::Document, key: &[u8]) -> Option<String> {
    let info = doc.trailer.get(b"Info").ok()?;
    let dict = match info {
        lopdf::Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
        lopdf::Object::Dictionary(dict) => dict,
        _ => return None,
    };
    let value = dict.get(key).ok()?;
    let bytes = value.as_str().ok()?;
    let text = decode_pdf_string(bytes);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// PDF text strings are either UTF-16BE with a BOM or PDFDocEncoding, which
/// is close enough to Latin-1 for display purposes.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        String::from_utf16_lossy(&units)
    } else {
        bytes.iter().map(|&b| b as char).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_utf16_with_bom() {
        let mut bytes = vec![0xFE, 0xFF];
        for c in "Tax Notice".encode_utf16() {
            bytes.extend_from_slice(&c.to_be_bytes());
        }
        assert_eq!(decode_pdf_string(&bytes), "Tax Notice");
    }

    #[test]
    fn decodes_latin1_fallback() {
        assert_eq!(decode_pdf_string(b"Caf\xe9"), "Café");
    }
}
