//! Text-generation providers
//!
//! OpenAI and DeepSeek share the OpenAI chat-completions wire format;
//! Anthropic speaks its own messages API. All three stream via SSE.

mod anthropic;
mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use openai_compat::OpenAiCompatProvider;

use inquest_config::GenerationBackend;
use inquest_core::TextGenerationProvider;
use std::sync::Arc;
use std::time::Duration;

/// Instantiate concrete providers for each admitted backend, preserving
/// the candidate order.
pub fn create_generation_providers(
    backends: &[GenerationBackend],
    timeout: Duration,
) -> Vec<Arc<dyn TextGenerationProvider>> {
    backends
        .iter()
        .map(|backend| -> Arc<dyn TextGenerationProvider> {
            match backend {
                GenerationBackend::OpenAi { api_key } => {
                    Arc::new(OpenAiCompatProvider::openai(api_key.clone(), timeout))
                }
                GenerationBackend::DeepSeek { api_key } => {
                    Arc::new(OpenAiCompatProvider::deepseek(api_key.clone(), timeout))
                }
                GenerationBackend::Anthropic { api_key } => {
                    Arc::new(AnthropicProvider::new(api_key.clone(), timeout))
                }
            }
        })
        .collect()
}
