//! `OpenAI` `TranslationModel` 实现

use async_trait::async_trait;

use crate::error::Result;
use crate::traits::TranslationModel;
use crate::types::{CompletionRequest, ProviderMetadata, ProviderType};

use super::{
    ChatMessage, ChatRequest, OPENAI_API_BASE, OPENAI_DEFAULT_MODEL, OpenAiProvider,
    PROVIDER_NAME, ResponseFormat,
};

impl OpenAiProvider {
    pub(crate) fn build_chat_request(&self, request: &CompletionRequest) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::new("system", &request.system),
                ChatMessage::new("user", &request.user),
            ],
            temperature: self.options.temperature,
            max_tokens: self.options.max_tokens,
            response_format: request.json_output.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        }
    }
}

#[async_trait]
impl TranslationModel for OpenAiProvider {
    fn id(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn metadata() -> ProviderMetadata {
        ProviderMetadata {
            id: ProviderType::OpenAi,
            name: "OpenAI".to_string(),
            description: "OpenAI chat completions API and compatible gateways".to_string(),
            default_model: OPENAI_DEFAULT_MODEL.to_string(),
            default_base_url: OPENAI_API_BASE.to_string(),
        }
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let body = self.build_chat_request(request);
        let response = self.post_chat(&body).await?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
