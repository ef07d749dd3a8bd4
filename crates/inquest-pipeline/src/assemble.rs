//! Wiring from configuration and resolved credentials to a runnable
//! pipeline

use crate::pipeline::ResearchPipeline;
use crate::registry::RunRegistry;
use inquest_cache::{SearchCache, SqlitePool, TopicCache};
use inquest_config::{generation_candidates, InquestConfig, Keys};
use inquest_core::{
    CircuitBreakerConfig, ProviderRegistry, RateLimitConfig, RunStore, SearchProvider,
};
use inquest_llm::{create_embedding_provider, create_generation_providers, TavilySearchProvider};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Build a pipeline from config, resolved keys, and a storage pool.
///
/// Providers are admitted based on which keys resolved: Tavily for
/// search, OpenAI/DeepSeek/Anthropic for generation, OpenAI embeddings
/// when available (hash embeddings otherwise). A missing provider class
/// surfaces as `PipelineError::NoProviderAvailable` at run time, not
/// here.
pub fn build_pipeline(
    config: &InquestConfig,
    keys: &Keys,
    pool: SqlitePool,
    run_store: Arc<dyn RunStore>,
) -> ResearchPipeline {
    let timeout = config.request_timeout();

    let registry = ProviderRegistry::new(
        CircuitBreakerConfig {
            failure_threshold: config.circuit.failure_threshold,
            base_delay: Duration::from_secs(config.circuit.base_delay_secs),
            max_delay: Duration::from_secs(config.circuit.max_delay_secs),
        },
        RateLimitConfig {
            max_requests: config.rate_limit.max_requests,
            window: Duration::from_secs(config.rate_limit.window_secs),
            acquire_timeout: Duration::from_secs(config.rate_limit.acquire_timeout_secs),
        },
    );

    let search_providers: Vec<Arc<dyn SearchProvider>> = keys
        .tavily
        .iter()
        .map(|key| Arc::new(TavilySearchProvider::new(key.clone(), timeout)) as Arc<dyn SearchProvider>)
        .collect();

    let generation_providers =
        create_generation_providers(&generation_candidates(keys), timeout);
    let embedder = create_embedding_provider(keys.openai.as_deref(), timeout);

    info!(
        search = search_providers.len(),
        generation = generation_providers.len(),
        embedder = embedder.name(),
        "assembled pipeline"
    );

    let search_cache = SearchCache::new(pool.clone(), Some(embedder))
        .with_ttl(config.search_cache_ttl())
        .with_candidate_limit(config.semantic_candidate_limit);
    let topic_cache = TopicCache::new(pool)
        .with_ttl(config.topic_cache_ttl())
        .with_marker_window(config.topic_marker_window());

    ResearchPipeline::new(
        registry,
        search_providers,
        generation_providers,
        Arc::new(search_cache),
        Arc::new(topic_cache),
        run_store,
    )
}

/// Build the full service surface: pipeline plus its run registry.
pub fn build_registry(
    config: &InquestConfig,
    keys: &Keys,
    pool: SqlitePool,
    run_store: Arc<dyn RunStore>,
) -> Arc<RunRegistry> {
    let pipeline = Arc::new(build_pipeline(config, keys, pool, run_store));
    Arc::new(RunRegistry::new(pipeline, config.max_concurrent_runs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::PipelineRequest;
    use crate::relay::CancelToken;
    use inquest_core::{InMemoryRunStore, NullSink, PipelineError};

    #[tokio::test]
    async fn pipeline_without_keys_reports_missing_search_provider() {
        let pipeline = build_pipeline(
            &InquestConfig::default(),
            &Keys::default(),
            SqlitePool::memory().unwrap(),
            Arc::new(InMemoryRunStore::new()),
        );

        let err = pipeline
            .run(
                &PipelineRequest::new("topic"),
                &NullSink,
                &CancelToken::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::NoProviderAvailable("search")));
    }

    #[test]
    fn registry_is_built_with_configured_concurrency() {
        let registry = build_registry(
            &InquestConfig::default(),
            &Keys::default(),
            SqlitePool::memory().unwrap(),
            Arc::new(InMemoryRunStore::new()),
        );
        // Smoke check: an unknown id is not cancellable.
        assert!(!registry.cancel(crate::registry::RunId(uuid::Uuid::new_v4())));
    }
}
