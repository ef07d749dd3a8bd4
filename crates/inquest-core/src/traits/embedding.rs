//! Embedding provider trait and vector helpers

use crate::error::EmbeddingResult;
use async_trait::async_trait;

/// Turns text into a fixed-length vector for similarity search
///
/// Implementations range from a zero-dependency hashing vectorizer to a
/// remote API. Each carries its own recommended similarity threshold:
/// hash-based vectors are noisier and need a much lower cutoff than neural
/// embeddings.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Vector length produced by this provider
    fn dimensions(&self) -> usize;

    /// Minimum cosine similarity at which two queries are considered
    /// equivalent for cache purposes
    fn recommended_threshold(&self) -> f32;

    /// Embed text into a vector of `dimensions()` floats
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;

    fn name(&self) -> &str;
}

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or zero-norm inputs rather than
/// erroring; a degenerate vector can never produce a cache hit.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
