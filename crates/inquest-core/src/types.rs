//! Shared request and response types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Search depth requested from a web-search backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchDepth {
    #[default]
    Basic,
    Advanced,
}

impl SearchDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            SearchDepth::Basic => "basic",
            SearchDepth::Advanced => "advanced",
        }
    }
}

impl fmt::Display for SearchDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Execution parameters for a search call
///
/// Two searches are cache-equivalent only when these match exactly; depth
/// and result-count differences are never treated as equivalent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchParams {
    pub depth: SearchDepth,
    pub max_results: u32,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            depth: SearchDepth::Basic,
            max_results: 5,
        }
    }
}

/// One result from a web-search backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
}

/// Complete response from a search call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<SearchResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub follow_up_questions: Vec<String>,
}

impl SearchResponse {
    pub fn empty(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            results: Vec::new(),
            answer: None,
            follow_up_questions: Vec::new(),
        }
    }
}

/// A text-generation request, provider-agnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub system_prompt: String,
    pub user_message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationRequest {
    pub fn new(system_prompt: impl Into<String>, user_message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            user_message: user_message.into(),
            max_tokens: None,
            temperature: default_temperature(),
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_depth_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&SearchDepth::Advanced).unwrap(),
            "\"advanced\""
        );
        assert_eq!(SearchDepth::Basic.to_string(), "basic");
    }

    #[test]
    fn search_response_roundtrip() {
        let response = SearchResponse {
            query: "quantum computing".to_string(),
            results: vec![SearchResult {
                title: "Intro".to_string(),
                url: "https://example.com".to_string(),
                content: "...".to_string(),
                score: 0.92,
                published_date: None,
            }],
            answer: Some("An answer".to_string()),
            follow_up_questions: vec![],
        };

        let json = serde_json::to_string(&response).unwrap();
        let parsed: SearchResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(response, parsed);
    }

    #[test]
    fn generation_request_builder() {
        let req = GenerationRequest::new("system", "user").with_max_tokens(512);
        assert_eq!(req.max_tokens, Some(512));
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
    }
}
