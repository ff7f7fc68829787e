use async_trait::async_trait;

use crate::error::{ProviderError, Result};
use crate::types::{CompletionRequest, ProviderMetadata};

/// Raw API error as returned by the service (internal use).
#[derive(Debug, Clone)]
pub(crate) struct RawApiError {
    /// HTTP status code.
    pub status: u16,
    /// Error code or type string, format differs per provider.
    pub code: Option<String>,
    /// Original error message.
    pub message: String,
}

impl RawApiError {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

/// Extra information available while mapping an error (internal use).
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorContext {
    /// Model the request targeted (for `ModelNotFound`).
    pub model: Option<String>,
}

/// Maps raw API errors onto [`ProviderError`] (internal use).
pub(crate) trait ProviderErrorMapper {
    /// Provider identifier used in error values and logs.
    fn provider_name(&self) -> &'static str;

    /// Map a raw API error to the unified error type.
    fn map_error(&self, raw: RawApiError, context: ErrorContext) -> ProviderError;

    fn parse_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::ParseError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    fn serialization_error(&self, detail: impl ToString) -> ProviderError {
        ProviderError::SerializationError {
            provider: self.provider_name().to_string(),
            detail: detail.to_string(),
        }
    }

    /// Fallback for codes with no specific mapping.
    fn unknown_error(&self, raw: RawApiError) -> ProviderError {
        ProviderError::Unknown {
            provider: self.provider_name().to_string(),
            raw_code: raw.code.or_else(|| Some(raw.status.to_string())),
            raw_message: raw.message,
        }
    }
}

/// A chat model that turns a prompt into text.
///
/// Implementations are stateless apart from their HTTP client and may be shared
/// across tasks behind an `Arc`.
#[async_trait]
pub trait TranslationModel: Send + Sync {
    /// Provider identifier.
    fn id(&self) -> &'static str;

    /// Type-level provider metadata.
    fn metadata() -> ProviderMetadata
    where
        Self: Sized;

    /// Model identifier requests are sent to.
    fn model(&self) -> &str;

    /// Run one completion and return the assistant text.
    ///
    /// An empty string is returned when the service answers without any text content;
    /// callers decide whether that is an error.
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;
}
