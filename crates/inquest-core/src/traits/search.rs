//! Web-search provider trait

use crate::error::ProviderResult;
use crate::types::{SearchParams, SearchResponse};
use async_trait::async_trait;

/// A web-search backend
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Execute a search. Implementations must bound the call with a
    /// timeout; callers are never awaited indefinitely.
    async fn search(&self, query: &str, params: &SearchParams) -> ProviderResult<SearchResponse>;

    /// Stable provider name used for rate-limiter and circuit bookkeeping
    fn name(&self) -> &str;
}
