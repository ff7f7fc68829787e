//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

pub use glotsync_provider::ProviderError;

/// Core layer error type
#[derive(Error, Debug, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// A live key with the same name already exists in the namespace
    #[error("Duplicate key '{key}' in namespace {namespace_id}")]
    DuplicateKey { namespace_id: String, key: String },

    /// Workspace key entitlement reached
    #[error("Key quota exceeded for workspace {workspace_id} (limit {limit})")]
    QuotaExceeded { workspace_id: String, limit: u64 },

    /// Primary value edit rejected while a dispatch holds the key
    #[error("Key is locked by an in-flight translation: {0}")]
    KeyLocked(String),

    /// Key not found (or already deleted)
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// Language not found in project
    #[error("Language not found: {0}")]
    LanguageNotFound(String),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    /// Namespace not found in project
    #[error("Namespace not found: {0}")]
    NamespaceNotFound(String),

    /// Workspace not found
    #[error("Workspace not found: {0}")]
    WorkspaceNotFound(String),

    /// Caller is not a member of the owning organization
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Model output could not be mapped back to keys
    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    /// Model returned no content
    #[error("Model returned an empty response")]
    EmptyResponse,

    /// Some target languages of a chunk failed; recorded on the dispatch report
    #[error("Chunk {chunk_id} failed for languages: {}", languages.join(", "))]
    PartialDispatchFailure {
        chunk_id: String,
        languages: Vec<String>,
    },

    /// Validation error
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Job queue rejected or dropped work
    #[error("Queue error: {0}")]
    QueueError(String),

    /// Model provider error (converting from library)
    #[error("{0}")]
    Provider(#[from] ProviderError),
}

impl CoreError {
    /// Whether it is expected behavior (user input, missing resource), used to pick
    /// the log level.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::DuplicateKey { .. }
            | Self::QuotaExceeded { .. }
            | Self::KeyLocked(_)
            | Self::KeyNotFound(_)
            | Self::LanguageNotFound(_)
            | Self::ProjectNotFound(_)
            | Self::NamespaceNotFound(_)
            | Self::WorkspaceNotFound(_)
            | Self::PermissionDenied(_)
            | Self::ValidationError(_) => true,
            Self::Provider(e) => e.is_expected(),
            _ => false,
        }
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;
