//! Embedding providers for semantic cache matching
//!
//! Two implementations: a remote OpenAI provider for high-quality vectors
//! and a deterministic local hash provider that needs no credentials.

mod hash;
mod openai;

pub use hash::{HashEmbedding, HASH_DIMENSIONS};
pub use openai::{OpenAiEmbedding, OPENAI_DIMENSIONS};

use inquest_core::EmbeddingProvider;
use std::sync::Arc;
use std::time::Duration;

/// Select an embedding provider based on available credentials.
///
/// With an OpenAI key the remote provider is used; otherwise the local
/// hash provider keeps semantic matching working offline.
pub fn create_embedding_provider(
    openai_key: Option<&str>,
    timeout: Duration,
) -> Arc<dyn EmbeddingProvider> {
    match openai_key {
        Some(key) if !key.trim().is_empty() => {
            tracing::debug!("using OpenAI embeddings for semantic cache");
            Arc::new(OpenAiEmbedding::new(key.trim(), timeout))
        }
        _ => {
            tracing::debug!("no OpenAI key, using local hash embeddings");
            Arc::new(HashEmbedding::new())
        }
    }
}
