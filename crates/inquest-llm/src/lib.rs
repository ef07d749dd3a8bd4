//! Provider implementations for Inquest
//!
//! Three provider families behind the traits in `inquest-core`:
//!
//! - **Embeddings**: a zero-dependency hashing vectorizer and an OpenAI
//!   remote embedder, with a factory that picks one from available
//!   credentials.
//! - **Text generation**: OpenAI and DeepSeek (OpenAI-compatible wire
//!   format) plus Anthropic, all with SSE streaming.
//! - **Web search**: Tavily.

pub mod embeddings;
pub mod generation;
pub mod search;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use embeddings::{create_embedding_provider, HashEmbedding, OpenAiEmbedding};
pub use generation::{create_generation_providers, AnthropicProvider, OpenAiCompatProvider};
pub use search::TavilySearchProvider;
