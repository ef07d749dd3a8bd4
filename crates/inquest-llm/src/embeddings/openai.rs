//! OpenAI remote embedding provider

use async_trait::async_trait;
use inquest_core::{EmbeddingError, EmbeddingProvider, EmbeddingResult};
use serde::Deserialize;
use std::time::Duration;

pub const OPENAI_DIMENSIONS: usize = 1536;
const DEFAULT_MODEL: &str = "text-embedding-3-small";

/// High-quality embeddings via the OpenAI API
pub struct OpenAiEmbedding {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl OpenAiEmbedding {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com".to_string(),
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            timeout,
        }
    }

    /// Point at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    fn dimensions(&self) -> usize {
        OPENAI_DIMENSIONS
    }

    fn recommended_threshold(&self) -> f32 {
        0.85
    }

    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let url = format!("{}/v1/embeddings", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "input": text.trim(),
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Http(format!(
                "embeddings API error ({status}): {detail}"
            )));
        }

        let parsed: EmbeddingsResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty data array".to_string()))
    }

    fn name(&self) -> &str {
        "openai-embedding"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn parses_embedding_from_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "data": [{"embedding": [0.1, 0.2, 0.3]}],
                "model": "text-embedding-3-small",
            })))
            .mount(&server)
            .await;

        let provider = OpenAiEmbedding::new("sk-test", Duration::from_secs(5))
            .with_base_url(server.uri());
        let vec = provider.embed("hello").await.unwrap();
        assert_eq!(vec, vec![0.1, 0.2, 0.3]);
    }

    #[tokio::test]
    async fn http_error_maps_to_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid key"))
            .mount(&server)
            .await;

        let provider = OpenAiEmbedding::new("sk-bad", Duration::from_secs(5))
            .with_base_url(server.uri());
        let err = provider.embed("hello").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::Http(_)));
    }

    #[test]
    fn threshold_is_high_for_neural_vectors() {
        let provider = OpenAiEmbedding::new("sk-test", Duration::from_secs(5));
        assert!((provider.recommended_threshold() - 0.85).abs() < f32::EPSILON);
        assert_eq!(provider.dimensions(), OPENAI_DIMENSIONS);
    }
}
