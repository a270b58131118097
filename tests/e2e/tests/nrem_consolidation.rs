//! Scenario 2 (spec §8): a cross-category EXTENDS chain in the low/mid
//! prominence band is fused into a single derived insight memory.

mod support;

use memory_core::config::NremConfig;
use memory_core::dream::run_nrem;
use memory_core::store::{MemoryQuery, Store};
use memory_core::types::{Category, LearnedFrom, Memory, MemoryType, Relation, RelationType};

#[tokio::test]
async fn chain_of_four_is_fused_into_one_derived_insight() {
    let store = Store::open_in_memory().unwrap();

    let categories = [Category::Preference, Category::Fact, Category::Fact, Category::Preference];
    let mut members = Vec::new();
    for category in categories {
        let mut m = Memory::new("u1", "a related detail", category);
        m.prominence = 0.25;
        store.add_memory(&m).unwrap();
        members.push(m);
    }
    for pair in members.windows(2) {
        let rel = Relation::new(pair[0].id, pair[1].id, RelationType::Extends, 0.8);
        store.add_relation(&rel).unwrap();
    }

    let provider = support::fixed_fusion("Prefers concrete, related facts grouped together.");
    let mut config = NremConfig::default();
    config.min_cluster_size = 3;

    let fused = run_nrem(&store, &provider, &config, "u1").await.unwrap();
    assert_eq!(fused, 1);

    let all = store.get_memories_by_user("u1", &MemoryQuery::default().with_all_sources()).unwrap();
    let derived: Vec<&Memory> = all.iter().filter(|m| m.memory_type == MemoryType::Derived).collect();
    assert_eq!(derived.len(), 1);
    assert_eq!(derived[0].category, Category::Insight);
    assert!(derived[0].prominence <= 0.6);
    assert_eq!(derived[0].learned_from, Some(LearnedFrom::NremConsolidation));
    assert_eq!(derived[0].metadata.get("nrem").and_then(|v| v.as_bool()), Some(true));

    let relations = store.get_relations_for_user("u1").unwrap();
    let derives_edges: Vec<&Relation> = relations.iter().filter(|r| r.relation_type == RelationType::Derives).collect();
    assert_eq!(derives_edges.len(), 4);

    let sources = store.get_memories_by_ids(&members.iter().map(|m| m.id).collect::<Vec<_>>()).unwrap();
    assert!(sources.iter().all(|m| m.memory_type == MemoryType::Superseded));
}
