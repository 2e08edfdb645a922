//! Manual-rename (correction) detection.
//!
//! A user who renames a processed file by hand is telling us the assigned
//! name was wrong; that signal is worth learning from at full confidence.
//! Detection is a pure function over two snapshots (the ledger's view of
//! the world and the directory listings as they are now), so it can be
//! tested without touching a real filesystem. Confirming and recording a
//! correction is the caller's job.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::models::{EntryOutcome, LedgerEntry};

/// A suspected manual rename, pending human confirmation.
#[derive(Debug, Clone)]
pub struct CorrectionCandidate {
    /// The latest ledger entry whose assigned name is no longer present.
    pub entry: LedgerEntry,
    /// An unclaimed PDF in the same directory that may be its new identity.
    pub candidate_name: String,
}

/// Directory listings keyed by directory path, values are file names.
pub type DirectoryListing = BTreeMap<String, BTreeSet<String>>;

/// Compare the ledger snapshot against current directory listings.
///
/// For each document lineage (latest applied entry per original path): if
/// the assigned name is absent from its directory while a PDF not claimed
/// by any other lineage is present, emit one candidate per such PDF.
/// Directories absent from `listing` are skipped; no listing means no
/// evidence either way.
pub fn detect_corrections(
    entries: &[LedgerEntry],
    listing: &DirectoryListing,
) -> Vec<CorrectionCandidate> {
    let latest = latest_per_path(entries);

    // Names any lineage currently claims, per directory.
    let mut claimed: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for entry in &latest {
        if let Some(dir) = parent_dir(&entry.original_path) {
            claimed.entry(dir).or_default().insert(&entry.new_name);
        }
    }

    let mut candidates = Vec::new();
    for entry in &latest {
        if entry.outcome != EntryOutcome::Applied {
            continue;
        }
        let Some(dir) = parent_dir(&entry.original_path) else {
            continue;
        };
        let Some(present) = listing.get(dir) else {
            continue;
        };
        if present.contains(&entry.new_name) {
            continue;
        }

        let dir_claimed = claimed.get(dir);
        for name in present {
            if !name.to_lowercase().ends_with(".pdf") {
                continue;
            }
            if dir_claimed.is_some_and(|c| c.contains(name.as_str())) {
                continue;
            }
            candidates.push(CorrectionCandidate {
                entry: (*entry).clone(),
                candidate_name: name.clone(),
            });
        }
    }

    candidates
}

/// Latest entry per original path, by timestamp.
pub fn latest_per_path(entries: &[LedgerEntry]) -> Vec<&LedgerEntry> {
    let mut latest: BTreeMap<&str, &LedgerEntry> = BTreeMap::new();
    for entry in entries {
        latest
            .entry(entry.original_path.as_str())
            .and_modify(|current| {
                if entry.timestamp > current.timestamp {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }
    latest.into_values().collect()
}

fn parent_dir(path: &str) -> Option<&str> {
    Path::new(path).parent().and_then(|p| p.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntrySource;
    use chrono::{Duration, Utc};

    fn entry(original: &str, new_name: &str, outcome: EntryOutcome) -> LedgerEntry {
        LedgerEntry {
            timestamp: Utc::now(),
            original_path: original.to_string(),
            original_name: Path::new(original)
                .file_name()
                .unwrap()
                .to_string_lossy()
                .to_string(),
            new_name: new_name.to_string(),
            date: Some("2024-03-01".to_string()),
            description: "Electric_Bill".to_string(),
            confidence: 0.9,
            source: EntrySource::Ai,
            model: Some("sonnet".to_string()),
            pattern_id: None,
            content_hash: "abc123".to_string(),
            extraction_method: "native".to_string(),
            reasoning: None,
            outcome,
        }
    }

    fn listing(dir: &str, names: &[&str]) -> DirectoryListing {
        let mut map = DirectoryListing::new();
        map.insert(
            dir.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        map
    }

    #[test]
    fn intact_file_yields_nothing() {
        let entries = vec![entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::Applied)];
        let l = listing("/scans", &["2024-03-01_Electric_Bill.pdf"]);
        assert!(detect_corrections(&entries, &l).is_empty());
    }

    #[test]
    fn missing_name_with_unclaimed_pdf_is_a_candidate() {
        let entries = vec![entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::Applied)];
        let l = listing("/scans", &["2024-03-01_Power_Statement.pdf"]);

        let found = detect_corrections(&entries, &l);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].candidate_name, "2024-03-01_Power_Statement.pdf");
        assert_eq!(found[0].entry.original_path, "/scans/a.pdf");
    }

    #[test]
    fn files_claimed_by_other_lineages_are_not_candidates() {
        let entries = vec![
            entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::Applied),
            entry("/scans/b.pdf", "2024-03-02_Water_Bill.pdf", EntryOutcome::Applied),
        ];
        // a's name is gone; the only other PDF belongs to b.
        let l = listing("/scans", &["2024-03-02_Water_Bill.pdf"]);
        assert!(detect_corrections(&entries, &l).is_empty());
    }

    #[test]
    fn non_pdf_files_are_ignored() {
        let entries = vec![entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::Applied)];
        let l = listing("/scans", &["notes.txt", "thumbs.db"]);
        assert!(detect_corrections(&entries, &l).is_empty());
    }

    #[test]
    fn dry_run_entries_are_ignored() {
        let entries = vec![entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::DryRun)];
        let l = listing("/scans", &["renamed.pdf"]);
        assert!(detect_corrections(&entries, &l).is_empty());
    }

    #[test]
    fn unlisted_directory_is_skipped() {
        let entries = vec![entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::Applied)];
        let l = listing("/other", &["whatever.pdf"]);
        assert!(detect_corrections(&entries, &l).is_empty());
    }

    #[test]
    fn only_latest_entry_per_lineage_counts() {
        let mut first = entry("/scans/a.pdf", "2024-03-01_Electric_Bill.pdf", EntryOutcome::Applied);
        first.timestamp = Utc::now() - Duration::days(2);
        let mut corrected = entry("/scans/a.pdf", "2024-03-01_Power_Statement.pdf", EntryOutcome::Applied);
        corrected.source = EntrySource::Correction;

        let entries = vec![first, corrected];
        // The corrected name is present; the old assigned name being gone is fine.
        let l = listing("/scans", &["2024-03-01_Power_Statement.pdf"]);
        assert!(detect_corrections(&entries, &l).is_empty());
    }
}
