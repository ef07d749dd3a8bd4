//! Provider trait abstractions
//!
//! All external backends are consumed through these traits so the
//! dispatcher, caches, and pipeline never depend on a concrete provider.

pub mod embedding;
pub mod generation;
pub mod search;

pub use embedding::{cosine_similarity, EmbeddingProvider};
pub use generation::TextGenerationProvider;
pub use search::SearchProvider;
