//! Pattern matching over keyword signatures.
//!
//! Scoring is asymmetric on purpose: `overlap` is the fraction of the
//! *pattern's* defining keywords present in the new document, so a document
//! may carry any amount of unrelated vocabulary without penalty, but must
//! cover the pattern's defining terms. A candidate qualifies at
//! `overlap >= min_overlap` and the winner maximizes
//! `overlap * confidence_avg`, which doubles as the confidence of the
//! resulting naming decision.

use crate::models::{Pattern, Signature};

/// Default qualification threshold. Kept as a plain constant: the value has
/// no documented derivation, callers may override it from configuration.
pub const DEFAULT_MIN_OVERLAP: f64 = 0.5;

/// A selected pattern together with how well it matched.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub pattern: Pattern,
    /// Fraction of the pattern's keywords covered by the signature.
    pub overlap: f64,
    /// `overlap * confidence_avg`, the decision confidence.
    pub score: f64,
}

/// Score `signature` against every candidate and pick the best qualifier.
///
/// Returns `None` when no candidate reaches `min_overlap`, signaling the
/// caller to fall back to external naming. Ties on the composite score are
/// broken by most recent `last_used_at`, then highest `times_applied`.
pub fn best_match(
    signature: &Signature,
    candidates: &[Pattern],
    min_overlap: f64,
) -> Option<PatternMatch> {
    let mut best: Option<PatternMatch> = None;

    for pattern in candidates {
        let keywords = pattern.keyword_set();
        if keywords.is_empty() {
            continue;
        }

        let hits = keywords.iter().filter(|&&k| signature.contains(k)).count();
        let overlap = hits as f64 / keywords.len() as f64;
        if overlap < min_overlap {
            continue;
        }

        let score = overlap * pattern.confidence_avg;
        let wins = match &best {
            None => true,
            Some(current) => {
                score > current.score
                    || (score == current.score
                        && (pattern.last_used_at > current.pattern.last_used_at
                            || (pattern.last_used_at == current.pattern.last_used_at
                                && pattern.times_applied > current.pattern.times_applied)))
            }
        };

        if wins {
            best = Some(PatternMatch {
                pattern: pattern.clone(),
                overlap,
                score,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn sig(terms: &[&str]) -> Signature {
        Signature {
            terms: terms.iter().map(|t| t.to_string()).collect(),
            considered: terms.len(),
        }
    }

    fn pattern(keywords: &[&str], confidence: f64) -> Pattern {
        Pattern::new(&sig(keywords), "Test_Template", confidence, Utc::now())
    }

    #[test]
    fn no_candidates_no_match() {
        assert!(best_match(&sig(&["a", "b"]), &[], DEFAULT_MIN_OVERLAP).is_none());
    }

    #[test]
    fn below_threshold_never_selected() {
        // 1 of 4 keywords covered => overlap 0.25, even at confidence 1.0.
        let p = pattern(&["a", "b", "c", "d"], 1.0);
        assert!(best_match(&sig(&["a", "x", "y"]), &[p], DEFAULT_MIN_OVERLAP).is_none());
    }

    #[test]
    fn full_coverage_of_small_pattern() {
        // Signature {a,b,c,d} vs pattern {a,b} at confidence_avg 0.9:
        // overlap = 2/2 = 1.0, composite = 0.9.
        let p = pattern(&["a", "b"], 0.9);
        let m = best_match(&sig(&["a", "b", "c", "d"]), &[p], DEFAULT_MIN_OVERLAP).unwrap();
        assert!((m.overlap - 1.0).abs() < 1e-9);
        assert!((m.score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn extra_document_keywords_carry_no_penalty() {
        let p = pattern(&["electric", "utility"], 0.8);
        let narrow = best_match(&sig(&["electric", "utility"]), &[p.clone()], 0.5).unwrap();
        let wide = best_match(
            &sig(&["electric", "utility", "march", "meter", "kwh"]),
            &[p],
            0.5,
        )
        .unwrap();
        assert_eq!(narrow.score, wide.score);
    }

    #[test]
    fn score_monotonic_in_overlap() {
        // Same confidence; covering more of the pattern never lowers the score.
        let p = pattern(&["a", "b", "c", "d"], 0.8);
        let half = best_match(&sig(&["a", "b"]), &[p.clone()], 0.5).unwrap();
        let three_quarters = best_match(&sig(&["a", "b", "c"]), &[p.clone()], 0.5).unwrap();
        let full = best_match(&sig(&["a", "b", "c", "d"]), &[p], 0.5).unwrap();
        assert!(half.score <= three_quarters.score);
        assert!(three_quarters.score <= full.score);
    }

    #[test]
    fn highest_composite_wins() {
        let weak = pattern(&["a", "b"], 0.6);
        let strong = pattern(&["a", "b"], 0.95);
        let m = best_match(&sig(&["a", "b"]), &[weak, strong.clone()], 0.5).unwrap();
        assert_eq!(m.pattern.id, strong.id);
    }

    #[test]
    fn ties_prefer_most_recently_used() {
        let now = Utc::now();
        let mut older = pattern(&["a", "b"], 0.8);
        older.last_used_at = now - Duration::days(30);
        let mut newer = pattern(&["a", "b"], 0.8);
        newer.last_used_at = now;

        let m = best_match(&sig(&["a", "b"]), &[older, newer.clone()], 0.5).unwrap();
        assert_eq!(m.pattern.id, newer.id);
    }

    #[test]
    fn ties_then_prefer_most_applied() {
        let now = Utc::now();
        let mut light = pattern(&["a", "b"], 0.8);
        light.last_used_at = now;
        let mut heavy = pattern(&["a", "b"], 0.8);
        heavy.last_used_at = now;
        heavy.times_applied = 7;

        let m = best_match(&sig(&["a", "b"]), &[light, heavy.clone()], 0.5).unwrap();
        assert_eq!(m.pattern.id, heavy.id);
    }

    #[test]
    fn empty_keyword_pattern_is_skipped() {
        let mut p = pattern(&["a"], 0.9);
        p.keywords.clear();
        assert!(best_match(&sig(&["a"]), &[p], 0.5).is_none());
    }
}
