//! `OpenAI` HTTP 请求方法

use crate::error::Result;
use crate::http_client::Endpoint;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};
use crate::utils::log_sanitizer::truncate_for_log;

use super::{ChatRequest, ChatResponse, OpenAiErrorBody, OpenAiProvider};

impl OpenAiProvider {
    /// POST `/chat/completions`
    pub(crate) async fn post_chat(&self, body: &ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body_json = serde_json::to_string(body).map_err(|e| self.serialization_error(e))?;
        log::debug!("Request Body: {}", truncate_for_log(&body_json));

        let request = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .body(body_json);

        let endpoint = Endpoint {
            provider: self.provider_name(),
            url: &url,
        };
        let response = endpoint
            .send_with_retry(request, self.options.max_retries)
            .await
            .map_err(|e| self.refine_rate_limit(e))?;

        if !response.is_success() {
            let status = response.status;
            let raw = match serde_json::from_str::<OpenAiErrorBody>(&response.body) {
                Ok(parsed) => {
                    let detail = parsed.error;
                    let code = detail.code.or(detail.error_type);
                    match code {
                        Some(code) => RawApiError::with_code(status, code, detail.message),
                        None => RawApiError::new(status, detail.message),
                    }
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
