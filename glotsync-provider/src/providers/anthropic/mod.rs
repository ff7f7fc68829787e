//! Anthropic messages API provider

mod error;
mod http;
mod provider;
mod types;

use reqwest::Client;

use crate::error::Result;
use crate::providers::common::{
    create_http_client, require_api_key, resolve_base_url, resolve_model,
};
use crate::types::ModelOptions;

pub(crate) use types::{
    AnthropicErrorBody, ContentBlock, Message, MessagesRequest, MessagesResponse,
};

pub(crate) const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com/v1";
pub(crate) const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub(crate) const ANTHROPIC_DEFAULT_MODEL: &str = "claude-3-5-haiku-latest";
pub(crate) const PROVIDER_NAME: &str = "anthropic";

/// Anthropic messages API provider
pub struct AnthropicProvider {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) options: ModelOptions,
}

impl AnthropicProvider {
    pub fn new(api_key: String, options: ModelOptions) -> Result<Self> {
        require_api_key(PROVIDER_NAME, &api_key)?;
        Ok(Self {
            client: create_http_client(PROVIDER_NAME, &options)?,
            base_url: resolve_base_url(&options, ANTHROPIC_API_BASE),
            model: resolve_model(&options, ANTHROPIC_DEFAULT_MODEL),
            api_key,
            options,
        })
    }
}
