//! Scriptable mock providers for tests
//!
//! Each mock records its calls and pops scripted outcomes in order, so
//! tests can drive fallback chains, streaming assembly, and semantic
//! cache matching without a network.

use async_trait::async_trait;
use futures::stream::BoxStream;
use inquest_core::{
    EmbeddingError, EmbeddingProvider, EmbeddingResult, GenerationRequest, ProviderError,
    ProviderResult, SearchParams, SearchProvider, SearchResponse, TextGenerationProvider,
};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Text-generation mock with a queue of scripted outcomes
pub struct MockGenerationProvider {
    name: String,
    script: Mutex<VecDeque<ProviderResult<String>>>,
    stream_chunk_size: usize,
    calls: AtomicUsize,
}

impl MockGenerationProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            stream_chunk_size: 4,
            calls: AtomicUsize::new(0),
        }
    }

    /// Queue a successful response
    pub fn respond_with(self, text: impl Into<String>) -> Self {
        self.script.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn fail_with(self, error: ProviderError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Character count per streamed chunk
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.stream_chunk_size = size.max(1);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> ProviderResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Rejected("mock script exhausted".to_string())))
    }
}

#[async_trait]
impl TextGenerationProvider for MockGenerationProvider {
    async fn generate(&self, _request: &GenerationRequest) -> ProviderResult<String> {
        self.next_outcome()
    }

    fn generate_stream<'a>(
        &'a self,
        _request: &GenerationRequest,
    ) -> BoxStream<'a, ProviderResult<String>> {
        let outcome = self.next_outcome();
        let chunk_size = self.stream_chunk_size;

        Box::pin(async_stream::stream! {
            match outcome {
                Ok(text) => {
                    let chars: Vec<char> = text.chars().collect();
                    for chunk in chars.chunks(chunk_size) {
                        yield Ok(chunk.iter().collect::<String>());
                    }
                }
                Err(e) => yield Err(e),
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Web-search mock that records queries and pops scripted outcomes
pub struct MockSearchProvider {
    name: String,
    script: Mutex<VecDeque<ProviderResult<SearchResponse>>>,
    queries: Mutex<Vec<String>>,
}

impl MockSearchProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn respond_with(self, response: SearchResponse) -> Self {
        self.script.lock().push_back(Ok(response));
        self
    }

    pub fn fail_with(self, error: ProviderError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Queries seen so far, in call order
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.queries.lock().len()
    }
}

#[async_trait]
impl SearchProvider for MockSearchProvider {
    async fn search(&self, query: &str, _params: &SearchParams) -> ProviderResult<SearchResponse> {
        self.queries.lock().push(query.to_string());
        self.script
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(SearchResponse::empty(query)))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Embedding mock with fixed per-text vectors
///
/// Texts without a registered vector get a constant fallback, which is
/// useful for forcing near-identical similarity in cache tests.
pub struct MockEmbeddingProvider {
    dimensions: usize,
    threshold: f32,
    vectors: Mutex<HashMap<String, Vec<f32>>>,
    fail: Mutex<bool>,
    calls: AtomicUsize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize, threshold: f32) -> Self {
        Self {
            dimensions,
            threshold,
            vectors: Mutex::new(HashMap::new()),
            fail: Mutex::new(false),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_vector(self, text: impl Into<String>, vector: Vec<f32>) -> Self {
        self.vectors.lock().insert(text.into(), vector);
        self
    }

    /// Make every subsequent `embed` call fail
    pub fn set_failing(&self, failing: bool) {
        *self.fail.lock() = failing;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn recommended_threshold(&self) -> f32 {
        self.threshold
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if *self.fail.lock() {
            return Err(EmbeddingError::Http("mock embedding failure".to_string()));
        }
        Ok(self
            .vectors
            .lock()
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![1.0; self.dimensions]))
    }

    fn name(&self) -> &str {
        "mock-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn generation_script_pops_in_order() {
        let provider = MockGenerationProvider::new("mock")
            .respond_with("first")
            .fail_with(ProviderError::Transient("down".to_string()));
        let request = GenerationRequest::new("s", "u");

        assert_eq!(provider.generate(&request).await.unwrap(), "first");
        assert!(provider.generate(&request).await.is_err());
        // Exhausted scripts reject rather than panic
        assert!(provider.generate(&request).await.is_err());
        assert_eq!(provider.calls(), 3);
    }

    #[tokio::test]
    async fn stream_chunks_reassemble_to_scripted_text() {
        let provider = MockGenerationProvider::new("mock")
            .respond_with("hello world")
            .with_chunk_size(3);
        let request = GenerationRequest::new("s", "u");

        let chunks: Vec<String> = provider
            .generate_stream(&request)
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert!(chunks.len() > 1);
        assert_eq!(chunks.concat(), "hello world");
    }

    #[tokio::test]
    async fn embedding_mock_returns_registered_vectors() {
        let provider = MockEmbeddingProvider::new(2, 0.9)
            .with_vector("known", vec![0.0, 1.0]);

        assert_eq!(provider.embed("known").await.unwrap(), vec![0.0, 1.0]);
        assert_eq!(provider.embed("unknown").await.unwrap(), vec![1.0, 1.0]);

        provider.set_failing(true);
        assert!(provider.embed("known").await.is_err());
    }
}
