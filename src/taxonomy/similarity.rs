//! Fuzzy similarity between normalized labels.
//!
//! The score is the larger of two views of the same pair:
//!
//! - token overlap (Sørensen–Dice over token sets), which is robust to word
//!   order and extra words (`"steam flow main"` vs `"main steam flow"`)
//! - normalized Damerau–Levenshtein over the whole string, which is robust to
//!   typos and truncations (`"generaton"` vs `"generation"`)
//!
//! Fuzzy scores are capped just below 1.0 so that only an exact alias can
//! ever reach the top tier. A single word that is only part of a longer
//! label (`"temperature"` vs `"steam temperature"`) is capped at
//! `PARTIAL_CEILING`: it says nothing about which of several qualified
//! parameters is meant.

use std::collections::BTreeSet;

/// Highest score a non-identical pair can receive.
pub const FUZZY_CEILING: f64 = 0.99;

/// Highest score a lone word contained in a longer label can receive.
pub const PARTIAL_CEILING: f64 = 0.5;

/// Similarity of two normalized labels in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    let overlap = token_dice(a, b);
    let edit = strsim::normalized_damerau_levenshtein(a, b);
    let ceiling = if is_partial_word(a, b) || is_partial_word(b, a) {
        PARTIAL_CEILING
    } else {
        FUZZY_CEILING
    };
    overlap.max(edit).min(ceiling)
}

/// `word` is a single token found among the several tokens of `label`.
fn is_partial_word(word: &str, label: &str) -> bool {
    let mut words = word.split_whitespace();
    let (Some(only), None) = (words.next(), words.next()) else {
        return false;
    };
    let mut count = 0;
    let mut found = false;
    for token in label.split_whitespace() {
        count += 1;
        found |= token == only;
    }
    found && count > 1
}

/// Sørensen–Dice coefficient over whitespace tokens.
pub fn token_dice(a: &str, b: &str) -> f64 {
    let ta: BTreeSet<&str> = a.split_whitespace().collect();
    let tb: BTreeSet<&str> = b.split_whitespace().collect();
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    let shared = ta.intersection(&tb).count();
    (2 * shared) as f64 / (ta.len() + tb.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_labels_score_one() {
        assert_eq!(similarity("coal consumption", "coal consumption"), 1.0);
    }

    #[test]
    fn reordered_tokens_are_capped_below_exact() {
        let s = similarity("pressure pump", "pump pressure");
        assert!(s >= 0.9 && s < 1.0, "{s}");
    }

    #[test]
    fn typo_scores_high() {
        let s = similarity("steam generaton", "steam generation");
        assert!(s > 0.9, "{s}");
    }

    #[test]
    fn unrelated_labels_score_low() {
        let s = similarity("date", "coal consumption");
        assert!(s < 0.4, "{s}");
    }

    #[test]
    fn lone_word_inside_a_longer_label_stays_below_the_floor() {
        assert_eq!(similarity("temperature", "steam temperature"), PARTIAL_CEILING);
        assert_eq!(similarity("main steam temperature", "temperature"), PARTIAL_CEILING);
        assert!(similarity("steam temperature", "main steam temperature") > PARTIAL_CEILING);
    }

    #[test]
    fn dice_counts_shared_tokens() {
        assert!((token_dice("a b", "a c") - 0.5).abs() < 1e-12);
        assert_eq!(token_dice("", "a"), 0.0);
    }
}
