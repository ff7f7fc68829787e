//! TOML configuration.
//!
//! ```toml
//! database_path = "/var/lib/glotsync/glotsync.db"
//!
//! [provider]
//! type = "anthropic"
//! api_key_env = "ANTHROPIC_API_KEY"
//! model = "claude-sonnet-4-5"
//!
//! [pipeline]
//! chunk_size = 20
//! workers = 4
//! style_rules = ["Use the informal second person."]
//! ```
//!
//! Every field is optional; missing ones take the defaults below.

use std::path::{Path, PathBuf};
use std::time::Duration;

use glotsync_core::error::{CoreError, CoreResult};
use glotsync_core::services::PipelineSettings;
use glotsync_provider::{ModelOptions, ProviderCredentials, ProviderType};
use serde::{Deserialize, Serialize};

const APP_DIR: &str = "glotsync";
const CONFIG_FILE_NAME: &str = "config.toml";
const DATABASE_FILE_NAME: &str = "glotsync.db";

/// Top-level configuration file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// `SQLite` database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    pub provider: ProviderConfig,
    pub pipeline: PipelineConfig,
}

/// `[provider]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    /// Environment variable holding the API key. The key itself never lives in the file.
    pub api_key_env: String,
    pub model: Option<String>,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        let options = ModelOptions::default();
        Self {
            provider_type: ProviderType::OpenAi,
            api_key_env: "GLOTSYNC_API_KEY".to_string(),
            model: options.model,
            base_url: options.base_url,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            max_retries: options.max_retries,
            timeout_secs: options.timeout_secs,
        }
    }
}

/// `[pipeline]` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub chunk_size: usize,
    /// Background workers consuming dispatch chunks
    pub workers: usize,
    /// Chunks that may wait in the queue before `enqueue` is refused
    pub queue_capacity: usize,
    pub lease_ttl_secs: u64,
    pub max_concurrent_languages: usize,
    pub style_rules: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let settings = PipelineSettings::default();
        Self {
            chunk_size: settings.chunk_size,
            workers: 4,
            queue_capacity: 256,
            lease_ttl_secs: settings.lease_ttl.as_secs(),
            max_concurrent_languages: settings.max_concurrent_languages,
            style_rules: settings.style_rules,
        }
    }
}

impl AppConfig {
    /// `<config dir>/glotsync/config.toml`, if the platform has a config directory.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            log::info!(
                "No config file at {}, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| {
            CoreError::StorageError(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&raw)?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> CoreResult<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| CoreError::ValidationError(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        if self.pipeline.workers == 0 {
            return Err(CoreError::ValidationError(
                "pipeline.workers must be at least 1".to_string(),
            ));
        }
        if self.pipeline.queue_capacity == 0 {
            return Err(CoreError::ValidationError(
                "pipeline.queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.provider.api_key_env.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "provider.api_key_env cannot be empty".to_string(),
            ));
        }
        self.pipeline_settings().validate()
    }

    /// Configured database path, else `<data dir>/glotsync/glotsync.db`.
    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .map(|d| d.join(APP_DIR))
                .unwrap_or_default()
                .join(DATABASE_FILE_NAME)
        })
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            chunk_size: self.pipeline.chunk_size,
            lease_ttl: Duration::from_secs(self.pipeline.lease_ttl_secs),
            max_concurrent_languages: self.pipeline.max_concurrent_languages,
            style_rules: self.pipeline.style_rules.clone(),
        }
    }

    pub fn model_options(&self) -> ModelOptions {
        ModelOptions {
            model: self.provider.model.clone(),
            base_url: self.provider.base_url.clone(),
            temperature: self.provider.temperature,
            max_tokens: self.provider.max_tokens,
            max_retries: self.provider.max_retries,
            timeout_secs: self.provider.timeout_secs,
        }
    }

    /// Credentials with the API key read from the environment.
    pub fn credentials(&self) -> CoreResult<ProviderCredentials> {
        self.credentials_with(|name| std::env::var(name).ok())
    }

    /// Credentials with the API key resolved by `lookup(api_key_env)`.
    pub fn credentials_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> CoreResult<ProviderCredentials> {
        let env = &self.provider.api_key_env;
        let api_key = lookup(env)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                CoreError::ValidationError(format!(
                    "API key for {} not found: set the {env} environment variable",
                    self.provider.provider_type
                ))
            })?;

        Ok(match self.provider.provider_type {
            ProviderType::OpenAi => ProviderCredentials::OpenAi { api_key },
            ProviderType::Anthropic => ProviderCredentials::Anthropic { api_key },
        })
    }
}
