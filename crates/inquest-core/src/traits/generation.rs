//! Text-generation provider trait

use crate::error::ProviderResult;
use crate::types::GenerationRequest;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// A text-generation backend
///
/// The streaming and non-streaming paths must produce identical content for
/// identical inputs; the streaming relay relies on this when assembling the
/// final result.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    /// Generate a complete response
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String>;

    /// Generate incrementally, yielding content deltas as they arrive
    fn generate_stream<'a>(
        &'a self,
        request: &GenerationRequest,
    ) -> BoxStream<'a, ProviderResult<String>>;

    /// Stable provider name used for rate-limiter and circuit bookkeeping
    fn name(&self) -> &str;
}
