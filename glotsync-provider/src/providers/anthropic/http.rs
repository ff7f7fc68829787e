//! Anthropic HTTP 请求方法

use crate::error::Result;
use crate::http_client::Endpoint;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::{
    ANTHROPIC_API_VERSION, AnthropicErrorBody, AnthropicProvider, MessagesRequest,
    MessagesResponse,
};

impl AnthropicProvider {
    /// POST `/messages`
    pub(crate) async fn post_messages(&self, body: &MessagesRequest) -> Result<MessagesResponse> {
        let url = format!("{}/messages", self.base_url);
        let body_json = serde_json::to_string(body).map_err(|e| self.serialization_error(e))?;
        log::debug!("Request Body: {}", truncate_for_log(&body_json));

        let request = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_API_VERSION)
            .header("Content-Type", "application/json")
            .body(body_json);

        let endpoint = Endpoint {
            provider: self.provider_name(),
            url: &url,
        };
        let response = endpoint
            .send_with_retry(request, self.options.max_retries)
            .await?;

        if !response.is_success() {
            let status = response.status;
            let raw = match serde_json::from_str::<AnthropicErrorBody>(&response.body) {
                Ok(parsed) => {
                    RawApiError::with_code(status, parsed.error.error_type, parsed.error.message)
                }
                Err(_) => RawApiError::new(status, truncate_for_log(&response.body)),
            };
            log::error!("[{}] API error {status}: {}", self.provider_name(), raw.message);
            return Err(self.map_error(
                raw,
                ErrorContext {
                    model: Some(body.model.clone()),
                },
            ));
        }

        endpoint.parse_json(&response.body)
    }
}
