//! Hash-based embedding provider
//!
//! Implements the hashing trick: tokens (unigrams, bigrams, trigrams) are
//! hashed to a position and sign in a fixed-size vector, which is then
//! L2-normalized. No network, no model files, deterministic output. Works
//! well for short text like search queries, at the cost of noisier vectors
//! than a neural embedder — hence the low recommended threshold.

use async_trait::async_trait;
use inquest_core::{EmbeddingProvider, EmbeddingResult};
use sha2::{Digest, Sha256};

pub const HASH_DIMENSIONS: usize = 256;

/// Zero-dependency hashing-trick vectorizer
#[derive(Debug, Clone)]
pub struct HashEmbedding {
    dimensions: usize,
}

impl HashEmbedding {
    pub fn new() -> Self {
        Self {
            dimensions: HASH_DIMENSIONS,
        }
    }

    pub fn with_dimensions(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Tokenize into unigrams, bigrams, and trigrams over lowercased,
    /// punctuation-stripped words.
    fn tokenize(text: &str) -> Vec<String> {
        let cleaned: String = text
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
            .collect();
        let words: Vec<&str> = cleaned.split_whitespace().collect();

        let mut tokens: Vec<String> = words.iter().map(|w| w.to_string()).collect();

        for pair in words.windows(2) {
            tokens.push(format!("{}_{}", pair[0], pair[1]));
        }
        for triple in words.windows(3) {
            tokens.push(format!("{}_{}_{}", triple[0], triple[1], triple[2]));
        }

        tokens
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        let tokens = Self::tokenize(text);
        if tokens.is_empty() {
            return vec;
        }

        for token in &tokens {
            let digest = Sha256::digest(token.as_bytes());
            let pos = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
                % self.dimensions;
            let sign = if u32::from_be_bytes([digest[4], digest[5], digest[6], digest[7]]) % 2 == 0
            {
                1.0
            } else {
                -1.0
            };
            vec[pos] += sign;
        }

        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

impl Default for HashEmbedding {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedding {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn recommended_threshold(&self) -> f32 {
        // Hash vectors produce much lower absolute cosine values than
        // neural embeddings.
        0.20
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        Ok(self.embed_sync(text))
    }

    fn name(&self) -> &str {
        "hash"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inquest_core::cosine_similarity;

    #[tokio::test]
    async fn embedding_is_deterministic() {
        let provider = HashEmbedding::new();
        let a = provider.embed("quantum computing basics").await.unwrap();
        let b = provider.embed("quantum computing basics").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), HASH_DIMENSIONS);
    }

    #[tokio::test]
    async fn different_text_gives_different_vectors() {
        let provider = HashEmbedding::new();
        let a = provider.embed("quantum computing").await.unwrap();
        let b = provider.embed("cooking recipes").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn similar_text_scores_higher_than_dissimilar() {
        let provider = HashEmbedding::new();
        let base = provider.embed("quantum computing basics").await.unwrap();
        let similar = provider
            .embed("introduction to quantum computing")
            .await
            .unwrap();
        let different = provider
            .embed("best chocolate cake recipe")
            .await
            .unwrap();

        assert!(cosine_similarity(&base, &similar) > cosine_similarity(&base, &different));
    }

    #[tokio::test]
    async fn empty_string_is_zero_vector() {
        let provider = HashEmbedding::new();
        let vec = provider.embed("").await.unwrap();
        assert_eq!(vec.len(), HASH_DIMENSIONS);
        assert!(vec.iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn vector_is_l2_normalized() {
        let provider = HashEmbedding::new();
        let vec = provider.embed("some nontrivial query text").await.unwrap();
        let norm: f32 = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn tokenize_includes_ngrams() {
        let tokens = HashEmbedding::tokenize("Quantum Computing Basics");
        assert!(tokens.contains(&"quantum".to_string()));
        assert!(tokens.contains(&"quantum_computing".to_string()));
        assert!(tokens.contains(&"quantum_computing_basics".to_string()));
    }

    #[test]
    fn threshold_is_low_for_noisy_vectors() {
        let provider = HashEmbedding::new();
        assert!((provider.recommended_threshold() - 0.20).abs() < f32::EPSILON);
    }
}
