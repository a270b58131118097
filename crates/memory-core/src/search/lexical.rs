//! Lexical scoring on top of SQLite FTS5.
//!
//! FTS5's `tokenize = 'porter'` (see migration V1) handles stemming and
//! candidate retrieval; this module owns the rank-normalization step the
//! design calls for on top of that, turning `bm25()`'s unbounded negative
//! scores into a `[0, 1]` value comparable across queries.

const STOPWORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "was", "were", "be", "been", "being", "to", "of", "in", "on",
    "for", "and", "or", "but", "with", "at", "by", "from", "about", "as", "into", "like",
];

pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(t))
        .map(|t| stem(t))
        .collect()
}

/// A small Porter-style suffix stripper. Not a full Porter implementation,
/// but covers the common English inflections well enough to improve recall
/// between plural/singular and verb-tense variants of the same term, ahead
/// of FTS5's own porter tokenizer doing the rest inside SQLite.
fn stem(word: &str) -> String {
    let w = word;
    for suffix in ["ational", "ization", "fulness", "ousness", "iveness"] {
        if w.len() > suffix.len() + 2 && w.ends_with(suffix) {
            return w[..w.len() - suffix.len()].to_string();
        }
    }
    for suffix in ["ing", "edly", "ed"] {
        if w.len() > suffix.len() + 2 && w.ends_with(suffix) {
            return w[..w.len() - suffix.len()].to_string();
        }
    }
    for suffix in ["ies"] {
        if w.len() > suffix.len() + 1 && w.ends_with(suffix) {
            return format!("{}y", &w[..w.len() - suffix.len()]);
        }
    }
    for suffix in ["es", "s"] {
        if w.len() > suffix.len() + 2 && w.ends_with(suffix) && !w.ends_with("ss") {
            return w[..w.len() - suffix.len()].to_string();
        }
    }
    w.to_string()
}

/// `bm25()` in SQLite returns a negative number where more negative means a
/// better match. Flips the sign and squashes it into `(0, 1]` with a
/// logistic curve so it fuses cleanly with cosine-similarity scores.
pub fn normalize_bm25(raw_rank: f64) -> f64 {
    let positive = -raw_rank;
    1.0 / (1.0 + (-positive / 4.0).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_drops_stopwords() {
        let tokens = tokenize("the user is a fan of espresso");
        assert!(!tokens.iter().any(|t| t == "the" || t == "is" || t == "a" || t == "of"));
        assert!(tokens.iter().any(|t| t == "espresso"));
    }

    #[test]
    fn stem_collapses_common_inflections() {
        assert_eq!(stem("running"), "runn");
        assert_eq!(stem("memories"), "memory");
        assert_eq!(stem("cats"), "cat");
    }

    #[test]
    fn normalize_bm25_is_monotonic_and_bounded() {
        let better = normalize_bm25(-10.0);
        let worse = normalize_bm25(-1.0);
        assert!(better > worse);
        assert!(better < 1.0 && better > 0.0);
    }
}
