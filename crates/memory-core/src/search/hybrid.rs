//! Fusion of lexical and vector result lists (§4.C).
//!
//! Carried over near-verbatim from the teacher's hybrid searcher: same RRF
//! and linear-combination formulas, generalized to the three search
//! profiles (`lexicalHeavy`, `balancedProminence`, `pureVector`) instead of
//! a single fixed weighting.

use std::collections::HashMap;

use crate::config::SearchProfile;

/// Reciprocal Rank Fusion: `score(d) = sum of 1/(k + rank(d))` across lists.
/// Normalizes across differently-scaled result lists and rewards items that
/// appear in more than one of them.
pub fn reciprocal_rank_fusion(
    lexical_results: &[(String, f32)],
    vector_results: &[(String, f32)],
    k: f32,
) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    for (rank, (key, _)) in lexical_results.iter().enumerate() {
        *scores.entry(key.clone()).or_default() += 1.0 / (k + rank as f32);
    }
    for (rank, (key, _)) in vector_results.iter().enumerate() {
        *scores.entry(key.clone()).or_default() += 1.0 / (k + rank as f32);
    }

    let mut results: Vec<(String, f32)> = scores.into_iter().collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Weighted sum of min-max-normalized scores from each list.
pub fn linear_combination(
    lexical_results: &[(String, f32)],
    vector_results: &[(String, f32)],
    lexical_weight: f32,
    vector_weight: f32,
) -> Vec<(String, f32)> {
    let mut scores: HashMap<String, f32> = HashMap::new();

    let max_lexical = lexical_results.first().map(|(_, s)| *s).unwrap_or(1.0).max(0.001);
    for (key, score) in lexical_results {
        *scores.entry(key.clone()).or_default() += (score / max_lexical) * lexical_weight;
    }

    let max_vector = vector_results.first().map(|(_, s)| *s).unwrap_or(1.0).max(0.001);
    for (key, score) in vector_results {
        *scores.entry(key.clone()).or_default() += (score / max_vector) * vector_weight;
    }

    let mut results: Vec<(String, f32)> = scores.into_iter().collect();
    results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    results
}

/// Fuses lexical and vector result lists according to the configured
/// search profile, then folds in prominence as a final re-weighting pass
/// (§4.C: "prominence acts as a tie-breaking and boosting factor, not a
/// primary ranking signal").
pub fn fuse_profile(
    lexical_results: &[(String, f32)],
    vector_results: &[(String, f32)],
    profile: SearchProfile,
    lexical_weight: f32,
    vector_weight: f32,
) -> Vec<(String, f32)> {
    match profile {
        SearchProfile::LexicalHeavy => linear_combination(lexical_results, vector_results, 0.8, 0.2),
        SearchProfile::PureVector => linear_combination(lexical_results, vector_results, 0.0, 1.0),
        SearchProfile::BalancedProminence => {
            linear_combination(lexical_results, vector_results, lexical_weight, vector_weight)
        }
    }
}

/// Applies a small multiplicative prominence boost to already-fused scores;
/// memories near 0 prominence are nudged down without being excluded
/// outright (exclusion is `min_score`'s job, not this).
pub fn apply_prominence_boost(fused: &mut [(String, f32)], prominence_of: impl Fn(&str) -> f32) {
    for (id, score) in fused.iter_mut() {
        let prominence = prominence_of(id);
        *score *= 0.7 + 0.3 * prominence;
    }
    fused.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
}
