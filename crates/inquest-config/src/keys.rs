//! API key resolution and provider candidate ordering
//!
//! Keys can come from the caller (per-request) or from the server
//! environment. Caller-supplied keys take priority. The set of resolved
//! keys determines which backends enter the fallback chain and in what
//! order (cheapest-adequate first once the preferred provider is present).

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Environment variable carrying each provider's server-side key
pub fn env_var_for_provider(provider: &str) -> Option<&'static str> {
    match provider.to_lowercase().as_str() {
        "openai" => Some("OPENAI_API_KEY"),
        "deepseek" => Some("DEEPSEEK_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "tavily" => Some("TAVILY_API_KEY"),
        _ => None,
    }
}

/// Where a resolved key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Supplied by the caller with the request
    User,
    /// Taken from the server environment
    Server,
    /// No key available
    Missing,
}

impl fmt::Display for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeySource::User => write!(f, "user"),
            KeySource::Server => write!(f, "server"),
            KeySource::Missing => write!(f, "missing"),
        }
    }
}

/// Per-provider API keys
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deepseek: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anthropic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tavily: Option<String>,
}

impl Keys {
    /// Resolve effective keys: caller-supplied values override the server
    /// environment.
    pub fn resolve(user: Option<&Keys>) -> Self {
        Self::resolve_with(user, |var| std::env::var(var).ok())
    }

    /// Resolve against an explicit environment lookup. Tests supply a
    /// fixed map here instead of mutating process environment.
    pub fn resolve_with<F>(user: Option<&Keys>, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |var: &str| env(var).filter(|v| !v.is_empty());
        let user = user.cloned().unwrap_or_default();
        Self {
            openai: user.openai.or_else(|| non_empty("OPENAI_API_KEY")),
            deepseek: user.deepseek.or_else(|| non_empty("DEEPSEEK_API_KEY")),
            anthropic: user.anthropic.or_else(|| non_empty("ANTHROPIC_API_KEY")),
            tavily: user.tavily.or_else(|| non_empty("TAVILY_API_KEY")),
        }
    }

    /// Which source would satisfy `provider` for this request
    pub fn source(user: Option<&Keys>, provider: &str) -> KeySource {
        let user_has = user
            .map(|k| k.get(provider).is_some())
            .unwrap_or(false);
        if user_has {
            return KeySource::User;
        }
        let server_has = env_var_for_provider(provider)
            .and_then(non_empty_env)
            .is_some();
        if server_has {
            KeySource::Server
        } else {
            KeySource::Missing
        }
    }

    pub fn get(&self, provider: &str) -> Option<&str> {
        match provider.to_lowercase().as_str() {
            "openai" => self.openai.as_deref(),
            "deepseek" => self.deepseek.as_deref(),
            "anthropic" => self.anthropic.as_deref(),
            "tavily" => self.tavily.as_deref(),
            _ => None,
        }
    }
}

fn non_empty_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// A generation backend admitted to the fallback chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationBackend {
    OpenAi { api_key: String },
    DeepSeek { api_key: String },
    Anthropic { api_key: String },
}

impl GenerationBackend {
    pub fn name(&self) -> &'static str {
        match self {
            GenerationBackend::OpenAi { .. } => "openai",
            GenerationBackend::DeepSeek { .. } => "deepseek",
            GenerationBackend::Anthropic { .. } => "anthropic",
        }
    }
}

/// Order generation backends by preference: OpenAI first when available,
/// then DeepSeek (cheap fallback), then Anthropic. Only backends with a
/// resolved key are admitted.
pub fn generation_candidates(keys: &Keys) -> Vec<GenerationBackend> {
    let mut candidates = Vec::new();

    if let Some(key) = &keys.openai {
        candidates.push(GenerationBackend::OpenAi {
            api_key: key.clone(),
        });
    }
    if let Some(key) = &keys.deepseek {
        candidates.push(GenerationBackend::DeepSeek {
            api_key: key.clone(),
        });
    }
    if let Some(key) = &keys.anthropic {
        candidates.push(GenerationBackend::Anthropic {
            api_key: key.clone(),
        });
    }

    debug!(
        count = candidates.len(),
        order = ?candidates.iter().map(|c| c.name()).collect::<Vec<_>>(),
        "resolved generation candidates"
    );
    candidates
}
