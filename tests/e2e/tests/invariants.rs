//! Spec §8 invariants not already exercised by a concrete scenario test.

mod support;

use memory_core::config::Config;
use memory_core::gardener::Gardener;
use memory_core::relations::{spread, ActivationParams};
use memory_core::store::Store;
use memory_core::types::{Category, Memory, Relation, RelationType};
use rand::rngs::StdRng;
use rand::SeedableRng;
use uuid::Uuid;

/// Invariant 6: spreading activation only returns nodes reachable from the
/// seed within `maxSteps` hops, never further out even with high noise.
#[test]
fn spreading_activation_never_reaches_beyond_max_steps() {
    // A 5-node chain; max_steps=2 should never activate node 4 (3 hops away).
    let nodes: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
    let edges: Vec<Relation> = nodes.windows(2).map(|w| Relation::new(w[0], w[1], RelationType::Extends, 0.9)).collect();
    let edges_of = move |id: Uuid| edges.iter().filter(|e| e.source_id == id || e.target_id == id).cloned().collect();

    let params = ActivationParams { max_steps: 2, decay_factor: 0.9, noise_sigma: 0.0, activation_threshold: 0.001 };
    let mut rng = StdRng::seed_from_u64(11);
    let result = spread(&[(nodes[0], 1.0)], edges_of, &params, &mut rng);

    assert!(result.contains_key(&nodes[1]));
    assert!(result.contains_key(&nodes[2]));
    assert!(!result.contains_key(&nodes[3]), "3 hops away must be unreachable within max_steps=2");
    assert!(!result.contains_key(&nodes[4]));
}

/// Invariant 5: after a light tick, every non-static-profile memory's
/// prominence is monotonically non-increasing.
#[tokio::test]
async fn light_tick_never_increases_prominence() {
    let store = Store::open_in_memory().unwrap();
    let mut m = Memory::new("u1", "occasional fact", Category::Fact);
    m.prominence = 0.7;
    m.last_accessed = chrono::Utc::now() - chrono::Duration::days(5);
    store.add_memory(&m).unwrap();

    let provider = support::always_send();
    let embedder = memory_core::embeddings::HashingEmbedder::default();
    let executor = support::NoopExecutor;
    let config = Config::default();
    let gardener = Gardener::new(&store, &provider, &embedder, &executor, &config);

    let before = store.get_memory(m.id).unwrap().prominence;
    let summary = gardener.light_tick("u1").await;
    assert!(summary.is_clean());
    let after = store.get_memory(m.id).unwrap().prominence;

    assert!(after <= before);
}

/// Invariant 7: a `kind=task` scheduled item always carries a `taskConfig`;
/// a `kind=nudge` item never does.
#[test]
fn nudges_never_carry_a_task_config() {
    let item = memory_core::types::ScheduledItem::nudge("u1", "stale_goal", "hi", chrono::Utc::now());
    assert!(item.task_config.is_none());
}
