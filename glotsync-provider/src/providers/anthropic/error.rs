//! Anthropic error mapping

use crate::error::ProviderError;
use crate::traits::{ErrorContext, ProviderErrorMapper, RawApiError};

use super::{AnthropicProvider, PROVIDER_NAME};

/// Reference: <https://docs.anthropic.com/en/api/errors>
impl ProviderErrorMapper for AnthropicProvider {
    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError {
        match raw.code.as_deref() {
            Some("authentication_error") => ProviderError::InvalidCredentials {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            Some("permission_error") => ProviderError::PermissionDenied {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            Some("not_found_error") => ProviderError::ModelNotFound {
                provider: self.provider_name().to_string(),
                model: context.model.unwrap_or_else(|| self.model.clone()),
                raw_message: Some(raw.message),
            },
            Some("invalid_request_error" | "request_too_large") => {
                ProviderError::InvalidParameter {
                    provider: self.provider_name().to_string(),
                    param: "request".to_string(),
                    detail: raw.message,
                }
            }
            Some("billing_error") => ProviderError::QuotaExceeded {
                provider: self.provider_name().to_string(),
                raw_message: Some(raw.message),
            },
            _ => match raw.status {
                401 => ProviderError::InvalidCredentials {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                },
                403 => ProviderError::PermissionDenied {
                    provider: self.provider_name().to_string(),
                    raw_message: Some(raw.message),
                },
                _ => self.unknown_error(raw),
            },
        }
    }
}
