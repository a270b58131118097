//! Deterministic local embedder used for tests and offline operation.
//!
//! Hashes overlapping word shingles into a fixed-width vector and
//! normalizes it, giving stable cosine similarity behavior (near-duplicate
//! text lands close together, unrelated text doesn't) without depending on
//! a model file. Feature-gated so a host crate wiring in a real embedding
//! provider doesn't pay for it.

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use super::{Embedder, EMBEDDING_DIMENSIONS};
use crate::error::ProviderError;

pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: EMBEDDING_DIMENSIONS,
        }
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        let normalized = text.to_lowercase();
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        if tokens.is_empty() {
            return vector;
        }

        for window in 1..=2usize {
            for shingle in tokens.windows(window.min(tokens.len())) {
                let joined = shingle.join(" ");
                let mut hasher = DefaultHasher::new();
                joined.hash(&mut hasher);
                let hash = hasher.finish();
                let bucket = (hash as usize) % self.dimensions;
                let sign = if hash & 1 == 0 { 1.0 } else { -1.0 };
                vector[bucket] += sign;
            }
        }

        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in vector.iter_mut() {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ProviderError> {
        Ok(self.embed_sync(text))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::cosine_similarity;

    #[tokio::test]
    async fn same_text_embeds_identically() {
        let embedder = HashingEmbedder::default();
        let a = embedder.embed("the quick brown fox").await.unwrap();
        let b = embedder.embed("the quick brown fox").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn similar_text_is_more_similar_than_unrelated_text() {
        let embedder = HashingEmbedder::default();
        let base = embedder.embed("the user prefers dark roast coffee").await.unwrap();
        let similar = embedder
            .embed("the user prefers dark roast coffee in the morning")
            .await
            .unwrap();
        let unrelated = embedder.embed("quarterly tax filing deadline reminder").await.unwrap();

        let sim_to_similar = cosine_similarity(&base, &similar);
        let sim_to_unrelated = cosine_similarity(&base, &unrelated);
        assert!(sim_to_similar > sim_to_unrelated);
    }

    #[tokio::test]
    async fn empty_text_embeds_to_zero_vector() {
        let embedder = HashingEmbedder::default();
        let v = embedder.embed("").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }
}
