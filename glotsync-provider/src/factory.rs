//! Provider factory functions and metadata.

use std::sync::Arc;

use crate::error::Result;
use crate::traits::TranslationModel;
use crate::types::{ModelOptions, ProviderCredentials, ProviderMetadata};

#[cfg(feature = "anthropic")]
use crate::providers::AnthropicProvider;
#[cfg(feature = "openai")]
use crate::providers::OpenAiProvider;

/// Creates a [`TranslationModel`] from credentials and call options.
///
/// The concrete provider type is determined by the [`ProviderCredentials`] variant.
///
/// # Examples
///
/// ```rust,no_run
/// use glotsync_provider::{create_provider, ModelOptions, ProviderCredentials};
///
/// let model = create_provider(
///     ProviderCredentials::OpenAi { api_key: "sk-...".to_string() },
///     ModelOptions::default(),
/// ).unwrap();
/// ```
pub fn create_provider(
    credentials: ProviderCredentials,
    options: ModelOptions,
) -> Result<Arc<dyn TranslationModel>> {
    match credentials {
        #[cfg(feature = "openai")]
        ProviderCredentials::OpenAi { api_key } => {
            Ok(Arc::new(OpenAiProvider::new(api_key, options)?))
        }
        #[cfg(feature = "anthropic")]
        ProviderCredentials::Anthropic { api_key } => {
            Ok(Arc::new(AnthropicProvider::new(api_key, options)?))
        }
    }
}

/// Returns metadata for all providers enabled via feature flags.
pub fn get_all_provider_metadata() -> Vec<ProviderMetadata> {
    vec![
        #[cfg(feature = "openai")]
        OpenAiProvider::metadata(),
        #[cfg(feature = "anthropic")]
        AnthropicProvider::metadata(),
    ]
}
