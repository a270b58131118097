//! NREM consolidation (§4.F): clusters related memories via graph BFS and
//! fuses each cluster into a single derived memory with an LLM.

use chrono::Utc;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

use crate::config::NremConfig;
use crate::error::{CoreError, ParseFailure, Result};
use crate::llm::{CompleteRequest, LlmProvider};
use crate::store::{MemoryQuery, Store};
use crate::types::{Category, ConsolidationHistory, LearnedFrom, Memory, MemoryType, Relation, RelationType};

const FUSION_SYSTEM_PROMPT: &str = "You synthesize a cluster of related memories into one concise, \
faithful memory that preserves every fact from the originals. Reply with only a single JSON object of \
the form {\"summary\": <string>, \"importance\": <integer 1-10>, \"category\": <preference|fact|event|relationship|insight>}, \
no preamble, no markdown fencing.";

/// A connected component of the relation graph, restricted to memories in
/// the prominence band NREM considers (neither brand new nor already
/// dormant). `relations` holds the subset of intra-cluster edges (both
/// endpoints are members) used to build the fusion prompt's CONNECTIONS
/// block.
#[derive(Debug, Clone)]
pub struct Cluster {
    pub members: Vec<Memory>,
    pub relations: Vec<Relation>,
}

/// Finds clusters by BFS over `UPDATES`/`EXTENDS` edges among active
/// memories whose prominence falls inside `[min_prominence, max_prominence)`.
/// `static_profile` and `derived` memories never participate: the former is
/// a standing fact the user asserted directly, the latter is already the
/// product of a previous consolidation.
pub fn find_clusters(config: &NremConfig, memories: &[Memory], relations: &[Relation]) -> Vec<Cluster> {
    let eligible: Vec<&Memory> = memories
        .iter()
        .filter(|m| m.prominence >= config.min_prominence && m.prominence < config.max_prominence)
        .filter(|m| !matches!(m.memory_type, MemoryType::StaticProfile | MemoryType::Derived))
        .collect();
    let eligible_ids: HashSet<Uuid> = eligible.iter().map(|m| m.id).collect();

    let intra_cluster_relations: Vec<&Relation> = relations
        .iter()
        .filter(|rel| {
            matches!(rel.relation_type, RelationType::Extends | RelationType::Updates)
                && eligible_ids.contains(&rel.source_id)
                && eligible_ids.contains(&rel.target_id)
        })
        .collect();

    let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for rel in &intra_cluster_relations {
        adjacency.entry(rel.source_id).or_default().push(rel.target_id);
        adjacency.entry(rel.target_id).or_default().push(rel.source_id);
    }

    let by_id: HashMap<Uuid, &Memory> = eligible.iter().map(|m| (m.id, *m)).collect();
    let mut visited: HashSet<Uuid> = HashSet::new();
    let mut clusters = Vec::new();

    for m in &eligible {
        if visited.contains(&m.id) {
            continue;
        }
        let mut queue = VecDeque::from([m.id]);
        let mut component_ids = Vec::new();
        visited.insert(m.id);

        while let Some(current) = queue.pop_front() {
            component_ids.push(current);
            for neighbor in adjacency.get(&current).cloned().unwrap_or_default() {
                if visited.insert(neighbor) {
                    queue.push_back(neighbor);
                }
            }
        }

        if component_ids.len() >= config.min_cluster_size {
            let component_set: HashSet<Uuid> = component_ids.iter().copied().collect();
            let members = component_ids.iter().filter_map(|id| by_id.get(id)).map(|m| (*m).clone()).collect();
            let cluster_relations = intra_cluster_relations
                .iter()
                .filter(|rel| component_set.contains(&rel.source_id) && component_set.contains(&rel.target_id))
                .map(|rel| (*rel).clone())
                .collect();
            clusters.push(Cluster { members, relations: cluster_relations });
        }
    }

    clusters.truncate(config.max_clusters);
    clusters
}

#[derive(serde::Deserialize)]
struct FusionReply {
    summary: String,
    importance: u8,
    category: String,
}

fn parse_fusion_reply(text: &str) -> Result<FusionReply> {
    let trimmed = text.trim();
    let json_slice = trimmed
        .find('{')
        .zip(trimmed.rfind('}'))
        .map(|(start, end)| &trimmed[start..=end])
        .unwrap_or(trimmed);

    serde_json::from_str(json_slice).map_err(|e| {
        let failure = ParseFailure { call_site: "dream::nrem::fuse_cluster", detail: e.to_string() };
        tracing::warn!(%failure, "nrem fusion reply did not parse as JSON");
        CoreError::Validation(failure.to_string())
    })
}

fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let head: String = s.chars().take(max).collect();
    format!("{head}…")
}

/// Builds the fusion prompt per §4.F step 3: numbered members with
/// content/category/importance, followed by a CONNECTIONS block listing
/// intra-cluster relations (capped at `max_relations_per_memory` per
/// sending member, target content truncated to 80 characters).
fn fusion_prompt(config: &NremConfig, cluster: &Cluster) -> String {
    let index_of: HashMap<Uuid, usize> = cluster.members.iter().enumerate().map(|(i, m)| (m.id, i)).collect();

    let members_block = cluster
        .members
        .iter()
        .enumerate()
        .map(|(i, m)| format!("  [{i}] ({}, importance {}) {}", m.category.as_str(), m.importance, m.content))
        .collect::<Vec<_>>()
        .join("\n");

    let mut per_sender_count: HashMap<usize, usize> = HashMap::new();
    let mut connection_lines = Vec::new();
    for rel in &cluster.relations {
        let (Some(&sender), Some(&receiver)) = (index_of.get(&rel.source_id), index_of.get(&rel.target_id)) else {
            continue;
        };
        let count = per_sender_count.entry(sender).or_insert(0);
        if *count >= config.max_relations_per_memory {
            continue;
        }
        *count += 1;
        let target = truncate_chars(&cluster.members[receiver].content, 80);
        connection_lines.push(format!(
            "  [{sender}] {} -> [{receiver}] (confidence {:.2}): {target}",
            rel.relation_type.as_str(),
            rel.confidence
        ));
    }
    let connections_block =
        if connection_lines.is_empty() { "  (no connections)".to_string() } else { connection_lines.join("\n") };

    format!("Cluster members:\n{members_block}\n\nCONNECTIONS:\n{connections_block}")
}

/// Fuses one cluster: asks the provider to synthesize its members into a
/// single memory, then atomically writes the derived memory, `DERIVES`
/// edges back to every source, and supersedes the sources.
pub async fn fuse_cluster(
    store: &Store,
    provider: &dyn LlmProvider,
    config: &NremConfig,
    user_id: &str,
    cluster: &Cluster,
) -> Result<Memory> {
    let prompt = fusion_prompt(config, cluster);
    let request = CompleteRequest::simple(FUSION_SYSTEM_PROMPT, prompt);
    let response = provider.complete(request).await.map_err(CoreError::Provider)?;
    let reply = parse_fusion_reply(&response.text())?;

    let avg_prominence = cluster.members.iter().map(|m| m.prominence).sum::<f32>() / cluster.members.len() as f32;
    let avg_confidence = cluster.members.iter().map(|m| m.confidence).sum::<f32>() / cluster.members.len() as f32;

    // A cluster spanning more than one category is, by construction, not
    // about any single one of them; forced to `insight` regardless of what
    // the LLM replied (§4.F step 6).
    let distinct_categories: HashSet<Category> = cluster.members.iter().map(|m| m.category).collect();
    let category = if distinct_categories.len() >= 2 {
        Category::Insight
    } else {
        Category::parse(&reply.category).unwrap_or(cluster.members[0].category)
    };

    let mut derived = Memory::new(user_id, reply.summary, category);
    derived.memory_type = MemoryType::Derived;
    derived.importance = reply.importance.clamp(1, 10);
    derived.confidence = avg_confidence;
    derived.prominence = (avg_prominence + 0.15).min(0.6);
    derived.learned_from = Some(LearnedFrom::NremConsolidation);
    derived.metadata = serde_json::json!({ "nrem": true });

    let edges: Vec<Relation> = cluster
        .members
        .iter()
        .map(|m| Relation::new(derived.id, m.id, RelationType::Derives, 0.9))
        .collect();
    let superseded_ids: Vec<Uuid> = cluster.members.iter().map(|m| m.id).collect();

    store
        .commit_nrem_cluster(&derived, &edges, &superseded_ids)
        .map_err(CoreError::from)?;

    Ok(derived)
}

/// Runs one NREM consolidation pass over `user_id`'s active memories and
/// records an audit row, per §4.F.
pub async fn run_nrem(
    store: &Store,
    provider: &dyn LlmProvider,
    config: &NremConfig,
    user_id: &str,
) -> Result<usize> {
    let memories = store.get_memories_by_user(user_id, &MemoryQuery::latest()).map_err(CoreError::from)?;
    let relations = store.get_relations_for_user(user_id).map_err(CoreError::from)?;
    let clusters = find_clusters(config, &memories, &relations);

    let mut fused_count = 0;
    let mut superseded_count = 0;
    for cluster in &clusters {
        match fuse_cluster(store, provider, config, user_id, cluster).await {
            Ok(_) => {
                fused_count += 1;
                superseded_count += cluster.members.len();
            }
            Err(e) => {
                tracing::warn!(error = %e, "nrem cluster fusion failed, skipping cluster");
            }
        }
    }

    store
        .record_consolidation(&ConsolidationHistory {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            clusters_considered: clusters.len() as u32,
            clusters_fused: fused_count as u32,
            memories_superseded: superseded_count as u32,
            ran_at: Utc::now(),
        })
        .map_err(CoreError::from)?;

    Ok(fused_count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Category;

    fn memory_with_prominence(prominence: f32) -> Memory {
        let mut m = Memory::new("u1", "content", Category::Fact);
        m.prominence = prominence;
        m
    }

    #[test]
    fn find_clusters_requires_minimum_size() {
        let config = NremConfig::default();
        let a = memory_with_prominence(0.3);
        let b = memory_with_prominence(0.3);
        let rel = Relation::new(a.id, b.id, RelationType::Extends, 0.8);
        let clusters = find_clusters(&config, &[a, b], &[rel]);
        assert!(clusters.is_empty(), "cluster of 2 is below default min_cluster_size of 3");
    }

    #[test]
    fn find_clusters_groups_connected_memories() {
        let mut config = NremConfig::default();
        config.min_cluster_size = 2;
        let a = memory_with_prominence(0.3);
        let b = memory_with_prominence(0.3);
        let c = memory_with_prominence(0.3);
        let rel_ab = Relation::new(a.id, b.id, RelationType::Extends, 0.8);
        let clusters = find_clusters(&config, &[a.clone(), b.clone(), c.clone()], &[rel_ab]);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].members.len(), 2);
        assert_eq!(clusters[0].relations.len(), 1);
    }

    #[test]
    fn find_clusters_excludes_out_of_band_prominence() {
        let mut config = NremConfig::default();
        config.min_cluster_size = 2;
        let a = memory_with_prominence(0.9); // above max_prominence default of 0.8
        let b = memory_with_prominence(0.3);
        let rel = Relation::new(a.id, b.id, RelationType::Extends, 0.8);
        let clusters = find_clusters(&config, &[a, b], &[rel]);
        assert!(clusters.is_empty());
    }

    #[test]
    fn find_clusters_treats_max_prominence_as_exclusive() {
        let mut config = NremConfig::default();
        config.min_cluster_size = 2;
        config.max_prominence = 0.8;
        let a = memory_with_prominence(0.8);
        let b = memory_with_prominence(0.3);
        let rel = Relation::new(a.id, b.id, RelationType::Extends, 0.8);
        let clusters = find_clusters(&config, &[a, b], &[rel]);
        assert!(clusters.is_empty(), "prominence exactly at max_prominence is out of band");
    }

    #[test]
    fn find_clusters_excludes_static_profile_and_derived_memories() {
        let mut config = NremConfig::default();
        config.min_cluster_size = 2;
        let mut a = memory_with_prominence(0.3);
        a.memory_type = MemoryType::StaticProfile;
        let b = memory_with_prominence(0.3);
        let c = memory_with_prominence(0.3);
        let rel_ab = Relation::new(a.id, b.id, RelationType::Extends, 0.8);
        let rel_bc = Relation::new(b.id, c.id, RelationType::Extends, 0.8);
        let clusters = find_clusters(&config, &[a, b, c], &[rel_ab, rel_bc]);
        assert!(clusters.is_empty(), "a single non-static member can't reach min_cluster_size of 2 alone");
    }

    #[test]
    fn fusion_prompt_notes_absence_of_connections() {
        let config = NremConfig::default();
        let cluster = Cluster { members: vec![memory_with_prominence(0.3)], relations: vec![] };
        let prompt = fusion_prompt(&config, &cluster);
        assert!(prompt.contains("(no connections)"));
    }

    #[test]
    fn fusion_prompt_caps_connections_per_sending_member() {
        let mut config = NremConfig::default();
        config.max_relations_per_memory = 1;
        let a = memory_with_prominence(0.3);
        let b = memory_with_prominence(0.3);
        let c = memory_with_prominence(0.3);
        let rel_ab = Relation::new(a.id, b.id, RelationType::Extends, 0.9);
        let rel_ac = Relation::new(a.id, c.id, RelationType::Extends, 0.9);
        let cluster = Cluster { members: vec![a, b, c], relations: vec![rel_ab, rel_ac] };
        let prompt = fusion_prompt(&config, &cluster);
        assert_eq!(prompt.matches("confidence").count(), 1);
    }
}
