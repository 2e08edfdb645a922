//! Budget-bounded text truncation for downstream analysis.
//!
//! Long documents are cut to a caller-supplied byte budget while keeping
//! the regions most likely to identify the document: the opening (headers
//! and dates), a slice around the midpoint, and the ending (totals and
//! signatures). Removed spans are replaced with explicit elision markers
//! so a reader can tell genuine content from cuts.
//!
//! Guarantees, for any input `t` and budget `b`:
//! - `truncate(t, b) == t` when `t.len() <= b`
//! - `truncate(t, b).len() <= b` otherwise
//! - `truncate(truncate(t, b), b) == truncate(t, b)`
//! - deterministic: no randomness in the midpoint sample

/// Marker inserted where the span between head and middle was removed.
const ELIDED_MARKER: &str = "\n\n[... content elided ...]\n\n";
/// Marker inserted where the span between middle and tail was removed.
const CONTINUED_MARKER: &str = "\n\n[... continued ...]\n\n";

/// Share of the budget kept from the start of the document.
const HEAD_PERCENT: usize = 60;
/// Share of the budget kept from around the midpoint.
const MIDDLE_PERCENT: usize = 20;

/// Truncate `text` to at most `max_chars` bytes.
///
/// Keeps 60% of the budget from the start, 20% from the midpoint, and the
/// remainder from the end, joined by elision markers. Budgets too small to
/// fit the three-region layout degrade to a plain head cut. All cuts snap
/// down to UTF-8 character boundaries, so the bound always holds.
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.len() <= max_chars {
        return text.to_string();
    }

    let marker_len = ELIDED_MARKER.len() + CONTINUED_MARKER.len();
    // Leave a few bytes per region so none of them degenerates to nothing.
    if max_chars < marker_len + 16 {
        return text[..floor_char_boundary(text, max_chars)].to_string();
    }

    let budget = max_chars - marker_len;
    let head_len = budget * HEAD_PERCENT / 100;
    let middle_len = budget * MIDDLE_PERCENT / 100;
    let tail_len = budget - head_len - middle_len;

    let head_end = floor_char_boundary(text, head_len);
    let head = &text[..head_end];

    // When the input barely exceeds the budget the three regions would
    // overlap; clamp each region to start no earlier than the previous
    // one ends so no content is emitted twice.
    let middle_start = ceil_char_boundary(
        text,
        (text.len() / 2).saturating_sub(middle_len / 2).max(head_end),
    );
    let middle_end = floor_char_boundary(text, (middle_start + middle_len).min(text.len()));
    let middle = &text[middle_start..middle_end];

    let tail_start = ceil_char_boundary(text, text.len().saturating_sub(tail_len).max(middle_end));
    let tail = &text[tail_start..];

    let mut out = String::with_capacity(max_chars);
    out.push_str(head);
    out.push_str(ELIDED_MARKER);
    out.push_str(middle);
    out.push_str(CONTINUED_MARKER);
    out.push_str(tail);
    out
}

/// Largest index `<= at` that lands on a char boundary.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut idx = at;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

/// Smallest index `>= at` that lands on a char boundary.
fn ceil_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut idx = at;
    while !s.is_char_boundary(idx) {
        idx += 1;
    }
    idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_input_is_untouched() {
        let text = "Invoice from Pacific Power";
        assert_eq!(truncate(text, 1000), text);
        assert_eq!(truncate(text, text.len()), text);
    }

    #[test]
    fn long_input_respects_budget() {
        let text = "a".repeat(10_000);
        for budget in [100, 500, 1000, 9_999] {
            let out = truncate(&text, budget);
            assert!(
                out.len() <= budget,
                "budget {} produced {} bytes",
                budget,
                out.len()
            );
        }
    }

    #[test]
    fn tiny_budget_degrades_to_head_cut() {
        let text = "hello world, this is a document".repeat(10);
        let out = truncate(&text, 8);
        assert_eq!(out, &text[..8]);
    }

    #[test]
    fn zero_budget_yields_empty() {
        assert_eq!(truncate("nonempty", 0), "");
    }

    #[test]
    fn idempotent_under_same_budget() {
        let text: String = (0..5000).map(|i| ((i % 26) as u8 + b'a') as char).collect();
        let once = truncate(&text, 300);
        let twice = truncate(&once, 300);
        assert_eq!(once, twice);
    }

    #[test]
    fn deterministic() {
        let text = "lorem ipsum dolor sit amet ".repeat(200);
        assert_eq!(truncate(&text, 400), truncate(&text, 400));
    }

    #[test]
    fn keeps_head_middle_and_tail() {
        let head = "HEADSTART".to_string() + &"h".repeat(2000);
        let middle = "m".repeat(2000);
        let tail = "t".repeat(2000) + "TAILEND";
        let text = format!("{}{}{}", head, middle, tail);

        let out = truncate(&text, 1000);
        assert!(out.starts_with("HEADSTART"));
        assert!(out.ends_with("TAILEND"));
        assert!(out.contains("[... content elided ...]"));
        assert!(out.contains("[... continued ...]"));
        assert!(out.contains('m'));
    }

    #[test]
    fn near_budget_input_keeps_regions_disjoint() {
        // Unique increasing tokens make any duplicated region visible.
        let text: String = (0..400).map(|i| format!("{i:04} ")).collect();
        for budget in [1990, 1900, 1500] {
            let out = truncate(&text, budget);
            assert!(out.len() <= budget);
            // Cuts may leave partial tokens at region edges; only full
            // four-digit tokens count.
            let tokens: Vec<u32> = out
                .split_whitespace()
                .filter(|t| t.len() == 4)
                .filter_map(|t| t.parse().ok())
                .collect();
            for pair in tokens.windows(2) {
                assert!(
                    pair[0] < pair[1],
                    "budget {}: token {} repeated or out of order after {}",
                    budget,
                    pair[1],
                    pair[0]
                );
            }
        }
    }

    #[test]
    fn multibyte_text_never_splits_a_char() {
        let text = "Ärger über die Prüfung — ".repeat(300);
        for budget in [50, 137, 301, 999] {
            let out = truncate(&text, budget);
            assert!(out.len() <= budget);
            // Would panic on invalid UTF-8 slicing above; also verify round-trip.
            assert!(out.chars().count() <= out.len());
        }
    }
}
