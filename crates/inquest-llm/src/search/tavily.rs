//! Tavily web-search provider

use async_trait::async_trait;
use inquest_core::{
    ProviderError, ProviderResult, SearchParams, SearchProvider, SearchResponse, SearchResult,
};
use serde::Deserialize;
use std::time::Duration;

/// Search provider backed by the Tavily API
pub struct TavilySearchProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
}

impl TavilySearchProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.tavily.com".to_string(),
            api_key: api_key.into(),
            timeout,
        }
    }

    /// Point at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

// Every field is optional: the API omits sections freely and a partial
// response should still produce usable results.
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<TavilyResult>,
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    follow_up_questions: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TavilyResult {
    #[serde(default)]
    title: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    score: f64,
    #[serde(default)]
    published_date: Option<String>,
}

#[async_trait]
impl SearchProvider for TavilySearchProvider {
    async fn search(&self, query: &str, params: &SearchParams) -> ProviderResult<SearchResponse> {
        let url = format!("{}/search", self.base_url);
        let body = serde_json::json!({
            "api_key": self.api_key,
            "query": query,
            "search_depth": params.depth.as_str(),
            "max_results": params.max_results,
            "include_answer": true,
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                format!("tavily API error ({status}): {detail}"),
            ));
        }

        let parsed: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Rejected(format!("failed to parse response: {e}")))?;

        Ok(SearchResponse {
            query: query.to_string(),
            results: parsed
                .results
                .into_iter()
                .map(|r| SearchResult {
                    title: r.title,
                    url: r.url,
                    content: r.content,
                    score: r.score,
                    published_date: r.published_date,
                })
                .collect(),
            answer: parsed.answer,
            follow_up_questions: parsed.follow_up_questions.unwrap_or_default(),
        })
    }

    fn name(&self) -> &str {
        "tavily"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use inquest_core::SearchDepth;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn search_maps_results_and_params() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .and(body_partial_json(serde_json::json!({
                "query": "rust async runtimes",
                "search_depth": "advanced",
                "max_results": 3,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "results": [
                    {
                        "title": "Tokio",
                        "url": "https://tokio.rs",
                        "content": "An async runtime",
                        "score": 0.97,
                    }
                ],
                "answer": "Tokio is the dominant runtime.",
            })))
            .mount(&server)
            .await;

        let provider = TavilySearchProvider::new("tvly-test", Duration::from_secs(5))
            .with_base_url(server.uri());
        let params = SearchParams {
            depth: SearchDepth::Advanced,
            max_results: 3,
        };
        let response = provider.search("rust async runtimes", &params).await.unwrap();

        assert_eq!(response.query, "rust async runtimes");
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].title, "Tokio");
        assert_eq!(response.answer.as_deref(), Some("Tokio is the dominant runtime."));
        assert!(response.follow_up_questions.is_empty());
    }

    #[tokio::test]
    async fn missing_sections_produce_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let provider = TavilySearchProvider::new("tvly-test", Duration::from_secs(5))
            .with_base_url(server.uri());
        let response = provider
            .search("anything", &SearchParams::default())
            .await
            .unwrap();

        assert!(response.results.is_empty());
        assert!(response.answer.is_none());
    }

    #[tokio::test]
    async fn server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let provider = TavilySearchProvider::new("tvly-test", Duration::from_secs(5))
            .with_base_url(server.uri());
        let err = provider
            .search("anything", &SearchParams::default())
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }
}
