//! Spreading activation over the typed relation graph (§4.D).
//!
//! Grounded in Collins & Loftus's 1975 associative-network model: starting
//! from a seed set, activation spreads along edges with multiplicative
//! decay per hop and additive Gaussian noise, bounded by a step count and
//! an activation floor. The same traversal powers both targeted retrieval
//! (small noise, sharpens toward the seed's true neighborhood) and REM
//! exploration (large noise, wanders further to surface unexpected links).

use std::collections::HashMap;

use rand::Rng;
use uuid::Uuid;

use crate::types::Relation;

/// Samples `N(0, sigma)` via Box-Muller, keeping the dependency footprint to
/// plain `rand` rather than pulling in `rand_distr` for a couple of call
/// sites. Shared with REM's seed-weighting noise term.
pub(crate) fn gaussian_noise<R: Rng>(rng: &mut R, sigma: f32) -> f32 {
    if sigma <= 0.0 {
        return 0.0;
    }
    let u1: f64 = rng.gen::<f64>().max(f64::EPSILON);
    let u2: f64 = rng.gen::<f64>();
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    (z0 as f32) * sigma
}

#[derive(Debug, Clone)]
pub struct ActivationParams {
    pub max_steps: u32,
    pub decay_factor: f32,
    pub noise_sigma: f32,
    pub activation_threshold: f32,
}

/// Runs bounded BFS spreading activation from `seeds`, returning every
/// memory reached with activation above `activation_threshold`, keyed by
/// id, excluding the seeds themselves.
pub fn spread<R: Rng>(
    seeds: &[(Uuid, f32)],
    edges_of: impl Fn(Uuid) -> Vec<Relation>,
    params: &ActivationParams,
    rng: &mut R,
) -> HashMap<Uuid, f32> {
    let mut activation: HashMap<Uuid, f32> = HashMap::new();
    let mut frontier: Vec<(Uuid, f32)> = Vec::new();

    for (id, weight) in seeds {
        activation.insert(*id, *weight);
        frontier.push((*id, *weight));
    }

    for _ in 0..params.max_steps {
        if frontier.is_empty() {
            break;
        }
        let mut next_frontier = Vec::new();

        for (node_id, node_activation) in &frontier {
            for edge in edges_of(*node_id) {
                let neighbor = if edge.source_id == *node_id {
                    edge.target_id
                } else if edge.target_id == *node_id {
                    edge.source_id
                } else {
                    continue;
                };

                let noise = gaussian_noise(rng, params.noise_sigma);
                let propagated =
                    (node_activation * params.decay_factor * edge.confidence + noise).max(0.0);

                if propagated < params.activation_threshold {
                    continue;
                }

                let slot = activation.entry(neighbor).or_insert(0.0);
                if propagated > *slot {
                    *slot = propagated;
                    next_frontier.push((neighbor, propagated));
                }
            }
        }

        frontier = next_frontier;
    }

    for (id, _) in seeds {
        activation.remove(id);
    }
    activation.retain(|_, v| *v >= params.activation_threshold);
    activation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RelationType;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn edge(source: Uuid, target: Uuid, confidence: f32) -> Relation {
        Relation::new(source, target, RelationType::Extends, confidence)
    }

    #[test]
    fn activation_decays_with_distance() {
        let seed = Uuid::new_v4();
        let hop1 = Uuid::new_v4();
        let hop2 = Uuid::new_v4();

        let edges = vec![edge(seed, hop1, 1.0), edge(hop1, hop2, 1.0)];
        let edges_of = move |id: Uuid| edges.iter().filter(|e| e.source_id == id || e.target_id == id).cloned().collect();

        let params = ActivationParams {
            max_steps: 4,
            decay_factor: 0.5,
            noise_sigma: 0.0,
            activation_threshold: 0.01,
        };
        let mut rng = StdRng::seed_from_u64(42);

        let result = spread(&[(seed, 1.0)], edges_of, &params, &mut rng);
        assert!(result.get(&hop1).unwrap() > result.get(&hop2).unwrap());
    }

    #[test]
    fn seeds_are_excluded_from_result() {
        let seed = Uuid::new_v4();
        let params = ActivationParams {
            max_steps: 2,
            decay_factor: 0.5,
            noise_sigma: 0.0,
            activation_threshold: 0.01,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let result = spread(&[(seed, 1.0)], |_| Vec::new(), &params, &mut rng);
        assert!(!result.contains_key(&seed));
        assert!(result.is_empty());
    }

    #[test]
    fn below_threshold_activation_is_dropped() {
        let seed = Uuid::new_v4();
        let far = Uuid::new_v4();
        let edges = vec![edge(seed, far, 0.01)];
        let edges_of = move |id: Uuid| edges.iter().filter(|e| e.source_id == id || e.target_id == id).cloned().collect();
        let params = ActivationParams {
            max_steps: 2,
            decay_factor: 0.1,
            noise_sigma: 0.0,
            activation_threshold: 0.5,
        };
        let mut rng = StdRng::seed_from_u64(7);
        let result = spread(&[(seed, 1.0)], edges_of, &params, &mut rng);
        assert!(result.is_empty());
    }
}
