//! OpenAI-compatible chat provider (OpenAI and DeepSeek)

use async_trait::async_trait;
use futures::stream::BoxStream;
use inquest_core::{GenerationRequest, ProviderError, ProviderResult, TextGenerationProvider};
use serde::Deserialize;
use std::time::Duration;

/// Chat provider for any backend speaking the OpenAI chat-completions
/// wire format. OpenAI and DeepSeek differ only in endpoint, model, and
/// bookkeeping name.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    name: String,
    timeout: Duration,
}

impl OpenAiCompatProvider {
    pub fn openai(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.openai.com".to_string(),
            api_key: api_key.into(),
            model: "gpt-4o-mini".to_string(),
            name: "openai".to_string(),
            timeout,
        }
    }

    pub fn deepseek(api_key: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://api.deepseek.com".to_string(),
            api_key: api_key.into(),
            model: "deepseek-chat".to_string(),
            name: "deepseek".to_string(),
            timeout,
        }
    }

    /// Point at a different endpoint (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_body(&self, request: &GenerationRequest, stream: bool) -> serde_json::Value {
        let mut body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system_prompt},
                {"role": "user", "content": request.user_message},
            ],
            "temperature": request.temperature,
            "stream": stream,
        });
        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }
        body
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChunk {
    choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatStreamChoice {
    delta: ChatDelta,
}

#[derive(Debug, Deserialize)]
struct ChatDelta {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl TextGenerationProvider for OpenAiCompatProvider {
    async fn generate(&self, request: &GenerationRequest) -> ProviderResult<String> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
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
                format!("{} API error ({status}): {detail}", self.name),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Rejected(format!("failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| ProviderError::Rejected("empty choices array".to_string()))
    }

    fn generate_stream<'a>(
        &'a self,
        request: &GenerationRequest,
    ) -> BoxStream<'a, ProviderResult<String>> {
        use async_stream::stream;
        use futures::StreamExt;

        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = self.build_body(request, true);
        let client = self.client.clone();
        let api_key = self.api_key.clone();
        let name = self.name.clone();
        let timeout = self.timeout;

        Box::pin(stream! {
            let response = client
                .post(&url)
                .bearer_auth(&api_key)
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

                                // Process complete SSE lines
                                while let Some(line_end) = buffer.find('\n') {
                                    let line = buffer[..line_end].trim().to_string();
                                    buffer = buffer[line_end + 1..].to_string();

                                    let Some(data) = line.strip_prefix("data:") else {
                                        continue;
                                    };
                                    let data = data.trim();
                                    if data.is_empty() || data == "[DONE]" {
                                        continue;
                                    }

                                    match serde_json::from_str::<ChatStreamChunk>(data) {
                                        Ok(chunk) => {
                                            if let Some(content) = chunk
                                                .choices
                                                .into_iter()
                                                .next()
                                                .and_then(|c| c.delta.content)
                                            {
                                                if !content.is_empty() {
                                                    yield Ok(content);
                                                }
                                            }
                                        }
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
                        format!("{name} API error ({status}): {detail}"),
                    ));
                }
                Err(e) => {
                    yield Err(ProviderError::Transient(e.to_string()));
                }
            }
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}
