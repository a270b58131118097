//! Scenario 3 (spec §8): two disjoint chains joined by one bridge memory;
//! REM exploration should surface new EXTENDS edges between previously
//! unconnected nodes, and never create or delete memories.

mod support;

use memory_core::config::RemConfig;
use memory_core::dream::run_rem;
use memory_core::store::{MemoryQuery, Store};
use memory_core::types::{Category, Memory, Relation, RelationType};
use rand::rngs::StdRng;
use rand::SeedableRng;

#[tokio::test]
async fn bridged_chains_surface_new_extends_edges_only() {
    let store = Store::open_in_memory().unwrap();

    let mut chain_a = Vec::new();
    let mut chain_b = Vec::new();
    for label in ["a1", "a2", "a3"] {
        let mut m = Memory::new("u1", format!("chain a node {label}"), Category::Fact);
        m.prominence = 0.3;
        store.add_memory(&m).unwrap();
        chain_a.push(m);
    }
    for label in ["b1", "b2", "b3"] {
        let mut m = Memory::new("u1", format!("chain b node {label}"), Category::Fact);
        m.prominence = 0.3;
        store.add_memory(&m).unwrap();
        chain_b.push(m);
    }

    for pair in chain_a.windows(2) {
        store.add_relation(&Relation::new(pair[0].id, pair[1].id, RelationType::Extends, 0.8)).unwrap();
    }
    for pair in chain_b.windows(2) {
        store.add_relation(&Relation::new(pair[0].id, pair[1].id, RelationType::Extends, 0.8)).unwrap();
    }
    // bridge A3 -- B1
    store
        .add_relation(&Relation::new(chain_a[2].id, chain_b[0].id, RelationType::Extends, 0.8))
        .unwrap();

    let before_count = store.get_memories_by_user("u1", &MemoryQuery::default().with_all_sources()).unwrap().len();
    let existing_pairs: std::collections::HashSet<(uuid::Uuid, uuid::Uuid)> = store
        .get_relations_for_user("u1")
        .unwrap()
        .iter()
        .map(|r| (r.source_id, r.target_id))
        .collect();

    let provider = support::fixed_judge_score(4.0);
    let mut config = RemConfig::default();
    config.max_seeds = 6;
    config.result_threshold = 0.0;
    config.min_judge_score = 3.0;
    let mut rng = StdRng::seed_from_u64(42);

    let accepted = run_rem(&store, &provider, &config, "u1", &mut rng).await.unwrap();

    let after_count = store.get_memories_by_user("u1", &MemoryQuery::default().with_all_sources()).unwrap().len();
    assert_eq!(before_count, after_count, "REM must never create or delete memories");

    let relations_after = store.get_relations_for_user("u1").unwrap();
    assert!(relations_after.iter().all(|r| r.relation_type != RelationType::Updates));
    assert!(relations_after.iter().all(|r| r.relation_type != RelationType::Derives));

    let new_edges: Vec<&Relation> = relations_after
        .iter()
        .filter(|r| !existing_pairs.contains(&(r.source_id, r.target_id)))
        .collect();
    assert_eq!(new_edges.len(), accepted);
    for edge in new_edges {
        assert_eq!(edge.relation_type, RelationType::Extends);
    }
}
