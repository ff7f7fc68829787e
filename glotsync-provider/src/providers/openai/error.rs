//! `OpenAI` error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::{OpenAiProvider, PROVIDER_NAME};

/// Reference: <https://platform.openai.com/docs/guides/error-codes>
impl ProviderErrorMapper for OpenAiProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match (raw.status, raw.code.as_deref()) {
            (_, Some("invalid_api_key")) | (401, _) => ProviderError::InvalidCredentials {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            (_, Some("model_not_found")) | (404, _) => ProviderError::ModelNotFound {
                provider: self.provider_name().to_string(),
                model: context.model.unwrap_or_else(|| self.model.clone()),
                raw_message: Some(raw.message),
            },
            (_, Some("insufficient_quota")) => ProviderError::QuotaExceeded {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            (403, _) => ProviderError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            (_, Some("context_length_exceeded")) => ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "messages".to_string(),
                detail: raw.message,
            },
            (400 | 422, _) => ProviderError::InvalidParameter {
                provider: self.provider_name().to_string(),
                param: "request".to_string(),
                detail: raw.message,
            },
            _ => self.unknown_error(raw),
        }
    }
}

impl OpenAiProvider {
    /// Reclassify a 429 whose body says the quota is exhausted.
    ///
    /// The shared HTTP layer turns every 429 into `RateLimited`; `OpenAI` also uses 429
    /// for `insufficient_quota`, which will not clear by waiting.
    pub(crate) fn refine_rate_limit(&self, err: ProviderError) -> ProviderError {
        match err {
            ProviderError::RateLimited {
                raw_message: Some(body),
                ..
            } if body.contains("insufficient_quota") => ProviderError::QuotaExceeded {
                provider: self.provider_name().to_string(),
                raw_message: Some(body),
            },
            other => other,
        }
    }
}
