//! Scenario 6 (spec §8): stale, never-accessed, low-prominence memories are
//! all archival-eligible and rank in ascending utility order.

use chrono::{Duration, Utc};
use memory_core::config::DecayConfig;
use memory_core::decay::{archival_decision, ArchivalDecision};
use memory_core::store::{MemoryQuery, Store};
use memory_core::types::{Category, Memory};

#[test]
fn five_stale_low_prominence_memories_are_all_archival_eligible_in_ascending_utility_order() {
    let store = Store::open_in_memory().unwrap();
    let now = Utc::now();

    for i in 0..5 {
        let mut m = Memory::new("u1", format!("note {i}"), Category::Fact);
        m.created_at = now - Duration::days(30);
        m.last_accessed = m.created_at;
        m.document_date = Some(m.created_at);
        m.prominence = 0.05;
        m.access_count = i as u32;
        store.add_memory(&m).unwrap();
    }

    let config = DecayConfig { archive_threshold: 0.1, ..DecayConfig::default() };
    let memories = store.get_memories_by_user("u1", &MemoryQuery::latest()).unwrap();
    assert_eq!(memories.len(), 5);

    for memory in &memories {
        assert_eq!(archival_decision(&config, memory, now), ArchivalDecision::Archive);
    }

    let low_utility = store.find_low_utility_memories("u1", f32::MAX, 10).unwrap();
    assert_eq!(low_utility.len(), 5);
    for pair in low_utility.windows(2) {
        assert!(pair[0].utility() <= pair[1].utility());
    }
}
