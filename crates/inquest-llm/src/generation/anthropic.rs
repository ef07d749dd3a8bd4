//! Anthropic messages provider

use async_trait::async_trait;
use futures::stream::BoxStream;
use inquest_core::{GenerationRequest, ProviderError, ProviderResult, TextGenerationProvider};
use serde::Deserialize;
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic provider speaking the `/v1/messages` API
pub struct AnthropicProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.anthropic.com".to_string(),
            api_key: api_key.into(),
            model: "claude-3-5-haiku-latest".to_string(),
            timeout,
        }
    }

    /// Point at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            // The messages API requires max_tokens
            "max_tokens": request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            "system": request.system_prompt,
            "messages": [
                {"role": "user", "content": request.user_message},
            ],
            "temperature": request.temperature,
            "stream": stream,
        })
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl TextGenerationProvider for AnthropicProvider {
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let url = format!("{}/v1/messages", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_body(request, false))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| ProviderError::Transient(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let detail = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(
                status,
                format!("anthropic API error ({status}): {detail}"),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Rejected(format!("failed to parse response: {e}")))?;

        let text: String = parsed
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect();
        if text.is_empty() {
            return Err(ProviderError::Rejected("empty content blocks".to_string()));
        }
        Ok(text)
    }

    fn generate_stream<'a>(
        &'a self,
        request: &GenerationRequest,
    ) -> BoxStream<'a, ProviderResult<String>> {
        use async_stream::stream;
        use futures::StreamExt;

        let url = format!("{}/v1/messages", self.base_url);
        let body = self.build_body(request, true);
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let timeout = self.timeout;

        Box::pin(stream! {
            let response = client
                .post(&url)
                .header("x-api-key", &api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body)
                .timeout(timeout)
                .send()
                .await;

            match response {
                Ok(res) if res.status().is_success() => {
                    let mut stream = res.bytes_stream();
                    let mut buffer = String::new();

                    while let Some(chunk_result) = stream.next().await {
                        match chunk_result {
                            Ok(bytes) => {
                                buffer.push_str(&String::from_utf8_lossy(&bytes));

                                while let Some(line_end) = buffer.find('\n') {
                                    let line = buffer[..line_end].trim().to_string();
                                    buffer = buffer[line_end + 1..].to_string();

                                    let Some(data) = line.strip_prefix("data:") else {
                                        continue;
                                    };
                                    let data = data.trim();
                                    if data.is_empty() {
                                        continue;
                                    }

                                    match serde_json::from_str::<StreamEvent>(data) {
                                        Ok(event) if event.event_type == "content_block_delta" => {
                                            if let Some(text) =
                                                event.delta.and_then(|d| d.text)
                                            {
                                                if !text.is_empty() {
                                                    yield Ok(text);
                                                }
                                            }
                                        }
                                        // message_start, ping, message_stop, ...
                                        Ok(_) => {}
                                        Err(e) => {
                                            yield Err(ProviderError::Rejected(format!(
                                                "failed to parse stream event: {e}"
                                            )));
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                yield Err(ProviderError::Transient(e.to_string()));
                            }
                        }
                    }
                }
                Ok(res) => {
                    let status = res.status().as_u16();
                    let detail = res.text().await.unwrap_or_default();
                    yield Err(ProviderError::from_status(
                        status,
                        format!("anthropic API error ({status}): {detail}"),
                    ));
                }
                Err(e) => {
                    yield Err(ProviderError::Transient(e.to_string()));
                }
            }
        })
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
