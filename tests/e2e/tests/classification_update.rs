//! Scenario 1 (spec §8): ingesting an update to an existing fact marks the
//! old memory superseded and links the two with an UPDATES edge.

mod support;

use memory_core::embeddings::{Embedder, HashingEmbedder};
use memory_core::relations::classify_on_write;
use memory_core::store::{MemoryQuery, Store};
use memory_core::types::{Category, MemoryType};

#[tokio::test]
async fn ingesting_an_update_supersedes_the_original() {
    let store = Store::open_in_memory().unwrap();
    let embedder = HashingEmbedder::default();

    let mut m1 = memory_core::types::Memory::new("u1", "Lives in Dublin", Category::Fact);
    m1.embedding = Some(embedder.embed(&m1.content).await.unwrap());
    store.add_memory(&m1).unwrap();

    let mut m2 = memory_core::types::Memory::new("u1", "Lives in Wicklow", Category::Fact);
    m2.embedding = Some(embedder.embed(&m2.content).await.unwrap());

    let provider = support::updates_target_zero();
    let outcome = classify_on_write(&store, &provider, &m2, 5).await.unwrap();

    assert_eq!(outcome.superseded, Some(m1.id));
    let relation = outcome.relation.expect("expected an UPDATES relation");
    assert_eq!(relation.relation_type, memory_core::types::RelationType::Updates);
    assert_eq!(relation.source_id, m2.id);
    assert_eq!(relation.target_id, m1.id);
    store.add_relation(&relation).unwrap();

    store.add_memory(&m2).unwrap();
    let mut superseded = m1.clone();
    superseded.is_latest = false;
    superseded.memory_type = MemoryType::Superseded;
    store.update_memory(&superseded).unwrap();

    let latest = store.get_memories_by_user("u1", &MemoryQuery::latest()).unwrap();
    assert!(latest.iter().all(|m| m.id != m1.id), "m1 must not appear among isLatest=true memories");
    assert!(latest.iter().any(|m| m.id == m2.id));
}
