//! Hybrid retrieval (§4.C): lexical FTS5 + vector cosine similarity fused
//! by search profile, prominence-boosted, and optionally LLM-reranked.

mod hybrid;
pub mod lexical;
mod rerank;

pub use hybrid::{apply_prominence_boost, fuse_profile, linear_combination, reciprocal_rank_fusion};
pub use rerank::rerank;

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;

use crate::config::SearchConfig;
use crate::embeddings::{cosine_similarity, Embedder};
use crate::error::{CoreError, Result};
use crate::llm::LlmProvider;
use crate::store::Store;
use crate::types::Memory;

#[derive(Debug, Clone)]
pub struct SearchResult {
    pub memory: Memory,
    pub score: f32,
}

/// Caches query embeddings so repeated searches for the same phrase (a
/// common pattern in conversational follow-ups) skip the embedder call.
/// Wraps an `Embedder`; callers that don't need caching use the embedder
/// directly instead.
pub struct CachedEmbedder<'a> {
    inner: &'a dyn Embedder,
    cache: Mutex<LruCache<String, Vec<f32>>>,
}

impl<'a> CachedEmbedder<'a> {
    pub fn new(inner: &'a dyn Embedder, capacity: NonZeroUsize) -> Self {
        Self { inner, cache: Mutex::new(LruCache::new(capacity)) }
    }

    pub async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, crate::error::ProviderError> {
        if let Some(hit) = self.cache.lock().expect("embedding cache lock poisoned").get(text) {
            return Ok(hit.clone());
        }
        let embedding = self.inner.embed(text).await?;
        self.cache
            .lock()
            .expect("embedding cache lock poisoned")
            .put(text.to_string(), embedding.clone());
        Ok(embedding)
    }
}

/// Runs the full hybrid search pipeline for `query` against `user_id`'s
/// active memories: lexical candidates from FTS5, vector candidates from
/// cosine similarity over the in-process working set, fusion by the
/// configured profile, a prominence boost, a `min_score` cut, and an
/// optional LLM rerank pass.
pub async fn search(
    store: &Store,
    embedder: &dyn Embedder,
    reranker: Option<&dyn LlmProvider>,
    config: &SearchConfig,
    user_id: &str,
    query: &str,
    limit: usize,
) -> Result<Vec<SearchResult>> {
    let source_limit = (limit * 4).max(20);

    let lexical_hits = store
        .search_fts(user_id, query, source_limit)
        .map_err(CoreError::from)?;
    let lexical_results: Vec<(String, f32)> = lexical_hits
        .iter()
        .map(|(m, rank)| (m.id.to_string(), lexical::normalize_bm25(*rank) as f32))
        .collect();

    let active = store
        .get_active_memories(user_id, 0.0)
        .map_err(CoreError::from)?;
    let query_embedding = embedder
        .embed(query)
        .await
        .map_err(CoreError::Provider)?;

    let mut vector_results: Vec<(String, f32)> = active
        .iter()
        .filter_map(|m| {
            m.embedding
                .as_ref()
                .map(|e| (m.id.to_string(), cosine_similarity(&query_embedding, e)))
        })
        .collect();
    vector_results.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    vector_results.truncate(source_limit);

    let mut fused = fuse_profile(
        &lexical_results,
        &vector_results,
        config.profile,
        config.lexical_weight,
        config.vector_weight,
    );

    let by_id: HashMap<String, &Memory> = active.iter().map(|m| (m.id.to_string(), m)).collect();
    let mut lexical_memories: HashMap<String, &Memory> = HashMap::new();
    for (m, _) in &lexical_hits {
        lexical_memories.insert(m.id.to_string(), m);
    }

    apply_prominence_boost(&mut fused, |id| {
        by_id
            .get(id)
            .or_else(|| lexical_memories.get(id))
            .map(|m| m.prominence)
            .unwrap_or(0.0)
    });

    fused.retain(|(_, score)| *score >= config.min_score);
    fused.truncate(limit.max(1) * 3);

    let mut candidates = Vec::new();
    for (id, score) in &fused {
        if let Some(m) = by_id.get(id).or_else(|| lexical_memories.get(id)) {
            candidates.push(((*m).clone(), *score));
        }
    }

    if config.rerank {
        if let Some(provider) = reranker {
            let just_memories: Vec<Memory> = candidates.iter().map(|(m, _)| m.clone()).collect();
            if let Ok(order) = rerank(provider, query, &just_memories).await {
                let reordered: Vec<(Memory, f32)> = order
                    .into_iter()
                    .filter_map(|i| candidates.get(i).cloned())
                    .collect();
                candidates = reordered;
            }
        }
    }

    candidates.truncate(limit);
    Ok(candidates
        .into_iter()
        .map(|(memory, score)| SearchResult { memory, score })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchProfile;
    use crate::embeddings::HashingEmbedder;
    use crate::types::Category;

    fn config() -> SearchConfig {
        SearchConfig {
            lexical_weight: 0.3,
            vector_weight: 0.7,
            min_score: 0.0,
            rerank: false,
            profile: SearchProfile::BalancedProminence,
        }
    }

    #[tokio::test]
    async fn search_finds_lexically_matching_memory() {
        let store = Store::open_in_memory().unwrap();
        let embedder = HashingEmbedder::default();

        let mut m = Memory::new("u1", "prefers dark roast coffee over tea", Category::Preference);
        m.embedding = Some(embedder.embed(&m.content).await.unwrap());
        store.add_memory(&m).unwrap();

        let mut unrelated = Memory::new("u1", "quarterly tax filing is due in April", Category::Fact);
        unrelated.embedding = Some(embedder.embed(&unrelated.content).await.unwrap());
        store.add_memory(&unrelated).unwrap();

        let results = search(&store, &embedder, None, &config(), "u1", "coffee", 5)
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert_eq!(results[0].memory.id, m.id);
    }

    #[tokio::test]
    async fn cached_embedder_returns_identical_vector_on_repeat_query() {
        let embedder = HashingEmbedder::default();
        let cached = CachedEmbedder::new(&embedder, NonZeroUsize::new(8).unwrap());

        let first = cached.embed("what do I like to drink").await.unwrap();
        let second = cached.embed("what do I like to drink").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn min_score_excludes_weak_matches() {
        let store = Store::open_in_memory().unwrap();
        let embedder = HashingEmbedder::default();
        let mut m = Memory::new("u1", "completely unrelated content about gardening", Category::Fact);
        m.embedding = Some(embedder.embed(&m.content).await.unwrap());
        store.add_memory(&m).unwrap();

        let mut strict_config = config();
        strict_config.min_score = 0.99;
        let results = search(&store, &embedder, None, &strict_config, "u1", "coffee", 5)
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
