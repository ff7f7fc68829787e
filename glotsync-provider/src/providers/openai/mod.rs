//! `OpenAI` chat completions provider
//!
//! Also works against OpenAI-compatible gateways via [`ModelOptions::base_url`].

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

pub(crate) use types::{ChatMessage, ChatRequest, ChatResponse, OpenAiErrorBody, ResponseFormat};

pub(crate) const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
pub(crate) const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub(crate) const PROVIDER_NAME: &str = "openai";

/// `OpenAI` chat completions provider
pub struct OpenAiProvider {
    pub(crate) client: Client,
    pub(crate) api_key: String,
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) options: ModelOptions,
}

impl OpenAiProvider {
    pub fn new(api_key: String, options: ModelOptions) -> Result<Self> {
        require_api_key(PROVIDER_NAME, &api_key)?;
        Ok(Self {
            client: create_http_client(PROVIDER_NAME, &options)?,
            base_url: resolve_base_url(&options, OPENAI_API_BASE),
            model: resolve_model(&options, OPENAI_DEFAULT_MODEL),
            api_key,
            options,
        })
    }
}
