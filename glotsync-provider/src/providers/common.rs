//! Provider 公共工具函数

use std::time::Duration;

use reqwest::Client;

use crate::error::{ProviderError, Result};
use crate::types::ModelOptions;

/// 默认连接超时（秒）
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// Build an HTTP client with the connect and request timeouts from `options`.
pub fn create_http_client(provider: &str, options: &ModelOptions) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS))
        .timeout(Duration::from_secs(options.timeout_secs.max(1)))
        .build()
        .map_err(|e| ProviderError::NetworkError {
            provider: provider.to_string(),
            detail: format!("Failed to create HTTP client: {e}"),
        })
}

/// Resolve the API base URL, dropping any trailing slash.
pub fn resolve_base_url(options: &ModelOptions, default: &str) -> String {
    options
        .base_url
        .as_deref()
        .filter(|url| !url.trim().is_empty())
        .unwrap_or(default)
        .trim_end_matches('/')
        .to_string()
}

/// Resolve the model name, falling back to the provider default.
pub fn resolve_model(options: &ModelOptions, default: &str) -> String {
    options
        .model
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(default)
        .to_string()
}

/// Reject API keys that are obviously unusable before any request is made.
pub fn require_api_key(provider: &str, api_key: &str) -> Result<()> {
    if api_key.trim().is_empty() {
        return Err(ProviderError::InvalidCredentials {
            provider: provider.to_string(),
            raw_message: Some("API key is empty".to_string()),
        });
    }
    Ok(())
}
