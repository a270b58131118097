//! REM exploration (§4.F): stochastic seeding, noisy spreading-activation
//! traversal, and an LLM judge that decides which candidate pairings are
//! genuinely creative connections worth keeping.

use chrono::Utc;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use crate::config::RemConfig;
use crate::error::{CoreError, Result};
use crate::llm::{CompleteRequest, LlmProvider};
use crate::relations::activation::gaussian_noise;
use crate::relations::{spread, ActivationParams};
use crate::store::{MemoryQuery, Store};
use crate::types::{Category, DreamHistory, Memory, Relation, RelationType};

const JUDGE_SYSTEM_PROMPT: &str = "You judge whether two memories form a genuinely useful, non-obvious \
connection worth recording as a link. Reply with a single line: SCORE: <0-5>, then REASON: <one sentence>.";

/// Samples up to `max_seeds` memories to start REM traversal from, weighting
/// each by `importance * prominence * (1 + N(0, seed_noise_sigma^2))` (§4.F
/// step 2) and taking the highest-weighted first, capped per-category so one
/// prolific category can't dominate the seed set.
pub fn sample_seeds<R: Rng>(config: &RemConfig, memories: &[Memory], rng: &mut R) -> Vec<Memory> {
    let mut weighted: Vec<(f32, &Memory)> = memories
        .iter()
        .map(|m| {
            let noise = gaussian_noise(rng, config.seed_noise_sigma);
            let weight = m.importance as f32 * m.prominence * (1.0 + noise);
            (weight, m)
        })
        .collect();
    weighted.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    let mut seeds = Vec::new();
    let mut per_category: HashMap<Category, usize> = HashMap::new();
    for (_, m) in weighted {
        if seeds.len() >= config.max_seeds {
            break;
        }
        let count = per_category.entry(m.category).or_insert(0);
        if *count >= config.max_seeds_per_category {
            continue;
        }
        *count += 1;
        seeds.push(m.clone());
    }

    seeds
}

struct JudgeVerdict {
    score: f32,
    reason: String,
}

fn parse_judge_reply(reply: &str) -> JudgeVerdict {
    let mut score = 0.0;
    let mut reason = String::new();
    for line in reply.lines() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("SCORE:") {
            score = rest.trim().parse::<f32>().unwrap_or(0.0);
        } else if let Some(rest) = line.strip_prefix("REASON:") {
            reason = rest.trim().to_string();
        }
    }
    JudgeVerdict { score, reason }
}

async fn judge_pair(provider: &dyn LlmProvider, a: &Memory, b: &Memory) -> Result<JudgeVerdict> {
    let prompt = format!("Memory A: {}\nMemory B: {}", a.content, b.content);
    let request = CompleteRequest::simple(JUDGE_SYSTEM_PROMPT, prompt);
    let response = provider.complete(request).await.map_err(CoreError::Provider)?;
    Ok(parse_judge_reply(&response.text()))
}

/// Every memory directly connected to `id`, in either edge direction and
/// regardless of relation type — the set REM must not re-propose a link to.
fn directly_connected(store: &Store, id: Uuid) -> HashSet<Uuid> {
    store
        .get_relations(id)
        .unwrap_or_default()
        .iter()
        .filter_map(|r| {
            if r.source_id == id {
                Some(r.target_id)
            } else if r.target_id == id {
                Some(r.source_id)
            } else {
                None
            }
        })
        .collect()
}

/// Runs one REM exploration pass: samples seeds from the same prominence
/// window NREM uses, spreads activation with a large noise sigma so the
/// traversal wanders beyond the seed's immediate neighborhood, judges each
/// candidate pairing not already directly connected to its seed, and writes
/// an `EXTENDS` edge for every one that clears `min_judge_score`.
pub async fn run_rem<R: Rng>(
    store: &Store,
    provider: &dyn LlmProvider,
    config: &RemConfig,
    user_id: &str,
    rng: &mut R,
) -> Result<usize> {
    let memories: Vec<Memory> = store
        .get_memories_by_user(user_id, &MemoryQuery::latest())
        .map_err(CoreError::from)?
        .into_iter()
        .filter(|m| m.prominence >= config.min_prominence && m.prominence < config.max_prominence)
        .collect();
    if memories.is_empty() {
        return Ok(0);
    }

    let seeds = sample_seeds(config, &memories, rng);
    let by_id: HashMap<Uuid, &Memory> = memories.iter().map(|m| (m.id, m)).collect();

    let params = ActivationParams {
        max_steps: config.max_steps,
        decay_factor: config.decay_factor,
        noise_sigma: config.noise_sigma,
        activation_threshold: config.activation_threshold,
    };

    let mut candidates_judged = 0;
    let mut connections_accepted = 0;

    for seed in &seeds {
        let edges_of = |id: Uuid| store.get_relations(id).unwrap_or_default();
        let activated = spread(&[(seed.id, 1.0)], edges_of, &params, rng);
        let excluded = directly_connected(store, seed.id);

        let mut ranked: Vec<(Uuid, f32)> = activated.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked.truncate(config.max_candidates_per_seed);

        for (candidate_id, activation) in ranked {
            if activation < config.result_threshold {
                continue;
            }
            if excluded.contains(&candidate_id) {
                continue;
            }
            let Some(candidate) = by_id.get(&candidate_id) else {
                continue;
            };

            candidates_judged += 1;
            let verdict = match judge_pair(provider, seed, candidate).await {
                Ok(v) => v,
                Err(e) => {
                    tracing::warn!(error = %e, "rem judge call failed, skipping candidate");
                    continue;
                }
            };

            if verdict.score >= config.min_judge_score {
                let relation = Relation::new(seed.id, candidate.id, RelationType::Extends, verdict.score / 5.0);
                if let Err(e) = store.add_relation(&relation) {
                    tracing::warn!(error = %e, "failed to persist rem connection");
                    continue;
                }
                tracing::debug!(reason = %verdict.reason, "rem connection accepted");
                connections_accepted += 1;
            }
        }
    }

    store
        .record_dream(&DreamHistory {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            seeds_sampled: seeds.len() as u32,
            candidates_judged,
            connections_accepted,
            ran_at: Utc::now(),
        })
        .map_err(CoreError::from)?;

    Ok(connections_accepted)
}
