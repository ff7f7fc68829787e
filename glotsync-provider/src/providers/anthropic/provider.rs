//! Anthropic `TranslationModel` 实现

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::TranslationModel;
use crate::types::{CompletionRequest, ProviderMetadata, ProviderType};

use super::{
    ANTHROPIC_API_BASE, ANTHROPIC_DEFAULT_MODEL, AnthropicProvider, ContentBlock, Message,
    MessagesRequest, PROVIDER_NAME,
};

impl AnthropicProvider {
    pub(crate) fn build_messages_request(&self, request: &CompletionRequest) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            system: request.system.clone(),
            messages: vec![Message {
                role: "user".to_string(),
                content: request.user.clone(),
            }],
            max_tokens: self.options.max_tokens,
            temperature: self.options.temperature,
        }
    }

    /// Concatenate the text blocks of a response, ignoring tool and thinking blocks.
    pub(crate) fn collect_text(blocks: Vec<ContentBlock>) -> String {
        blocks
            .into_iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("")
    }
}

#[async_trait]
impl TranslationModel for AnthropicProvider {
    fn id(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::Anthropic,
            name: "Anthropic".to_string(),
            description: "Anthropic Claude messages API".to_string(),
            default_model: ANTHROPIC_DEFAULT_MODEL.to_string(),
            default_base_url: ANTHROPIC_API_BASE.to_string(),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_messages_request(request);
        let response = self.post_messages(&body).await?;
        Ok(Self::collect_text(response.content))
    }
}
