//! Typed relation graph: write-path classification and spreading
//! activation over it (§4.D).

pub mod activation;
pub mod classifier;

pub use activation::{spread, ActivationParams};
pub use classifier::{classify, classify_prompt, parse_classification, Classification};

use rand::Rng;
use uuid::Uuid;

use crate::config::TARGETED_ACTIVATION_NOISE_SIGMA;
use crate::embeddings::cosine_similarity;
use crate::error::{CoreError, ProviderError, Result};
use crate::llm::LlmProvider;
use crate::store::Store;
use crate::types::{Memory, Relation, RelationType};

/// Result of running the write-path policy for one ingested memory.
pub struct WriteOutcome {
    pub relation: Option<Relation>,
    pub superseded: Option<Uuid>,
}

/// The full ingest-time decision in §4.D: find the most similar existing
/// memories, ask the classifier how the new one relates to them, and
/// translate that into a graph edge plus, for `UPDATES`, a supersession.
pub async fn classify_on_write(
    store: &Store,
    provider: &dyn LlmProvider,
    new_memory: &Memory,
    candidate_pool_size: usize,
) -> Result<WriteOutcome> {
    let active = store
        .get_active_memories(&new_memory.user_id, 0.0)
        .map_err(CoreError::from)?;

    let Some(new_embedding) = new_memory.embedding.as_ref() else {
        return Ok(WriteOutcome { relation: None, superseded: None });
    };

    let mut scored: Vec<(&Memory, f32)> = active
        .iter()
        .filter(|m| m.id != new_memory.id)
        .filter_map(|m| m.embedding.as_ref().map(|e| (m, cosine_similarity(new_embedding, e))))
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(candidate_pool_size);

    let candidates: Vec<Memory> = scored.iter().map(|(m, _)| (*m).clone()).collect();
    if candidates.is_empty() {
        return Ok(WriteOutcome { relation: None, superseded: None });
    }

    let classification = classify(provider, &new_memory.content, &candidates)
        .await
        .map_err(CoreError::Provider)?;

    match (&classification, classification.target_index()) {
        (Classification::Updates { confidence, .. }, Some(idx)) => {
            let target = &candidates[idx];
            let relation = Relation::new(new_memory.id, target.id, RelationType::Updates, *confidence);
            Ok(WriteOutcome {
                relation: Some(relation),
                superseded: Some(target.id),
            })
        }
        (Classification::Extends { confidence, .. }, Some(idx)) => {
            let target = &candidates[idx];
            let relation = Relation::new(new_memory.id, target.id, RelationType::Extends, *confidence);
            Ok(WriteOutcome { relation: Some(relation), superseded: None })
        }
        _ => Ok(WriteOutcome { relation: None, superseded: None }),
    }
}

/// Targeted-retrieval spreading activation: a small noise sigma so the
/// traversal sharpens toward the seed's true neighborhood rather than
/// wandering, per §4.D. Returns ids augmented beyond the seed set.
pub fn activate_from_seeds<R: Rng>(
    store: &Store,
    seeds: &[(Uuid, f32)],
    max_steps: u32,
    rng: &mut R,
) -> Result<Vec<(Uuid, f32)>> {
    let params = ActivationParams {
        max_steps,
        decay_factor: 0.6,
        noise_sigma: TARGETED_ACTIVATION_NOISE_SIGMA,
        activation_threshold: 0.05,
    };

    let edges_of = |id: Uuid| store.get_relations(id).unwrap_or_default();
    let activated = spread(seeds, edges_of, &params, rng);
    let mut result: Vec<(Uuid, f32)> = activated.into_iter().collect();
    result.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    Ok(result)
}
