//! Model selection

use std::sync::Arc;

use async_trait::async_trait;
use glotsync_app::AppConfig;
use glotsync_provider::{
    create_provider, CompletionRequest, ProviderError, ProviderMetadata, ProviderType,
    TranslationModel,
};

/// Stand-in used when no API key is available.
///
/// Read-only commands never call it; anything that dispatches marks its languages
/// failed, leaving them stale for a later `translate`.
pub struct UnconfiguredModel {
    api_key_env: String,
}

#[async_trait]
impl TranslationModel for UnconfiguredModel {
    fn id(&self) -> &'static str {
        "unconfigured"
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::OpenAi,
            name: "Unconfigured".to_string(),
            description: "No API key configured".to_string(),
            default_model: String::new(),
            default_base_url: String::new(),
        }
    }

    fn model(&self) -> &str {
        ""
    }

    async fn complete(&self, _request: &CompletionRequest) -> glotsync_provider::Result<String> {
        Err(ProviderError::InvalidCredentials {
            provider: self.id().to_string(),
            raw_message: Some(format!("set {} to enable translation", self.api_key_env)),
        })
    }
}

/// Build the configured provider, or an `UnconfiguredModel` when the API key is missing.
pub fn load_model(config: &AppConfig) -> anyhow::Result<Arc<dyn TranslationModel>> {
    match config.credentials() {
        Ok(credentials) => {
            let model = create_provider(credentials, config.model_options())?;
            tracing::debug!("Using {} model {}", model.id(), model.model());
            Ok(model)
        }
        Err(e) => {
            tracing::debug!("{e}");
            Ok(Arc::new(UnconfiguredModel {
                api_key_env: config.provider.api_key_env.clone(),
            }))
        }
    }
}
