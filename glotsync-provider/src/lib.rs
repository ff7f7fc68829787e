//! # glotsync-provider
//!
//! Thin clients for the chat-model services glotsync uses to translate copy.
//! Every provider implements [`TranslationModel`]: one system prompt and one user
//! message in, the assistant text out.
//!
//! ## Supported Providers
//!
//! | Provider | Feature Flag | Auth Method |
//! |----------|-------------|-------------|
//! | [OpenAI](https://platform.openai.com/) and compatible gateways | `openai` | Bearer Token |
//! | [Anthropic](https://www.anthropic.com/) | `anthropic` | `x-api-key` header |
//!
//! ## Feature Flags
//!
//! - `all-providers` (default) enables every provider.
//! - `native-tls` (default) or `rustls` selects the TLS backend for `reqwest`.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use glotsync_provider::{create_provider, CompletionRequest, ModelOptions, ProviderCredentials};
//!
//! # async fn run() -> glotsync_provider::Result<()> {
//! let model = create_provider(
//!     ProviderCredentials::Anthropic { api_key: "sk-ant-...".to_string() },
//!     ModelOptions::default(),
//! )?;
//! let text = model
//!     .complete(&CompletionRequest::new("Translate to French.", "Hello"))
//!     .await?;
//! println!("{text}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All calls return [`Result<T, ProviderError>`](ProviderError). Transient errors
//! (`NetworkError`, `Timeout`, `RateLimited`) are retried with exponential backoff
//! up to [`ModelOptions::max_retries`] times before being surfaced.

mod error;
mod factory;
mod http_client;
mod providers;
mod traits;
mod types;
mod utils;

pub use error::{ProviderError, Result};

pub use factory::{create_provider, get_all_provider_metadata};

pub use traits::TranslationModel;

pub use types::{
    CompletionRequest, ModelOptions, ProviderCredentials, ProviderMetadata, ProviderType,
};

pub use utils::log_sanitizer;

#[cfg(feature = "anthropic")]
pub use providers::AnthropicProvider;

#[cfg(feature = "openai")]
pub use providers::OpenAiProvider;
