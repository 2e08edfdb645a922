//! Keyword signature extraction.
//!
//! Derives a compact, order-independent [`Signature`] from document text:
//! lower-cased, punctuation stripped, stop-words removed, duplicates
//! collapsed, and capped to the most frequent terms so comparisons stay
//! cheap and boilerplate terms don't dominate. Pure and deterministic:
//! the same text always yields the same signature.

use std::collections::HashMap;

use crate::models::Signature;

/// Default cap on signature size.
pub const DEFAULT_MAX_KEYWORDS: usize = 20;

/// Words shorter than this never qualify.
const MIN_WORD_LEN: usize = 3;

/// Terms too common in scanned paperwork to distinguish anything.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "that", "this", "with", "from", "have", "has", "are", "was", "were",
    "been", "being", "will", "would", "could", "should", "may", "might", "must", "shall", "can",
    "need", "please", "page", "date", "amount", "total", "number", "account", "name",
];

/// Extract a keyword signature from `text`, keeping at most `max_keywords`
/// terms ranked by frequency (ties broken alphabetically for determinism).
pub fn keywords(text: &str, max_keywords: usize) -> Signature {
    let mut counts: HashMap<String, usize> = HashMap::new();

    for raw in text.split(|c: char| !c.is_alphabetic()) {
        if raw.chars().count() < MIN_WORD_LEN {
            continue;
        }
        let word = raw.to_lowercase();
        if STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        *counts.entry(word).or_insert(0) += 1;
    }

    let considered = counts.len();

    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.truncate(max_keywords);

    Signature {
        terms: ranked.into_iter().map(|(word, _)| word).collect(),
        considered,
    }
}
