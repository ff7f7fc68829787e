use serde::{Deserialize, Serialize};

// ============ Provider Types ============

/// Identifies which model service backs a [`TranslationModel`](crate::TranslationModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// `OpenAI` chat completions (and compatible gateways). Requires feature `openai`.
    #[cfg(feature = "openai")]
    #[serde(rename = "openai")]
    OpenAi,
    /// Anthropic messages API. Requires feature `anthropic`.
    #[cfg(feature = "anthropic")]
    Anthropic,
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            #[cfg(feature = "openai")]
            Self::OpenAi => write!(f, "openai"),
            #[cfg(feature = "anthropic")]
            Self::Anthropic => write!(f, "anthropic"),
        }
    }
}

// ============ Credentials & Options ============

/// Credentials for a model provider, tagged by provider type.
///
/// ```json
/// { "type": "openai", "apiKey": "sk-..." }
/// ```
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ProviderCredentials {
    /// `OpenAI` API key.
    #[cfg(feature = "openai")]
    #[serde(rename = "openai", rename_all = "camelCase")]
    OpenAi {
        /// Bearer API key.
        api_key: String,
    },
    /// Anthropic API key.
    #[cfg(feature = "anthropic")]
    #[serde(rename = "anthropic", rename_all = "camelCase")]
    Anthropic {
        /// `x-api-key` value.
        api_key: String,
    },
}

impl ProviderCredentials {
    /// Provider type these credentials belong to.
    #[must_use]
    pub fn provider_type(&self) -> ProviderType {
        match *self {
            #[cfg(feature = "openai")]
            Self::OpenAi { .. } => ProviderType::OpenAi,
            #[cfg(feature = "anthropic")]
            Self::Anthropic { .. } => ProviderType::Anthropic,
        }
    }
}

// API keys stay out of Debug output.
impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("type", &self.provider_type())
            .field("api_key", &"****")
            .finish()
    }
}

/// Per-model call options.
///
/// # Default
///
/// Provider default model and endpoint, `temperature = 0.2`, `max_tokens = 4096`,
/// `max_retries = 3`, `timeout_secs = 60`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ModelOptions {
    /// Model identifier; `None` selects the provider default.
    pub model: Option<String>,
    /// Alternative API base URL (proxies, compatible gateways, tests).
    pub base_url: Option<String>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Upper bound on completion tokens.
    pub max_tokens: u32,
    /// Retries for transient failures (0 disables retrying).
    pub max_retries: u32,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for ModelOptions {
    fn default() -> Self {
        Self {
            model: None,
            base_url: None,
            temperature: 0.2,
            max_tokens: 4096,
            max_retries: 3,
            timeout_secs: 60,
        }
    }
}

// ============ Requests ============

/// A single-turn completion: one system prompt, one user message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// System instructions.
    pub system: String,
    /// User message.
    pub user: String,
    /// Ask the provider for a JSON object response when it supports it.
    #[serde(default)]
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            json_output: false,
        }
    }

    #[must_use]
    pub fn with_json_output(mut self) -> Self {
        self.json_output = true;
        self
    }
}

// ============ Metadata ============

/// Static description of a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderMetadata {
    /// Provider type identifier.
    pub id: ProviderType,
    /// Human-readable provider name.
    pub name: String,
    /// Short description of the provider.
    pub description: String,
    /// Model used when [`ModelOptions::model`] is `None`.
    pub default_model: String,
    /// API base URL used when [`ModelOptions::base_url`] is `None`.
    pub default_base_url: String,
}
