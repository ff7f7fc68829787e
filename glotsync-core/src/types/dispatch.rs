//! Dispatch chunk and report types

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which target languages a chunk translates into
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "mode", content = "languageIds", rename_all = "lowercase")]
pub enum TargetLanguages {
    /// Every non-deleted project language except the source
    #[default]
    All,
    /// Exactly these language ids
    Only(Vec<String>),
}

/// Unit of asynchronous translation work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchChunk {
    /// Also the lease owner for every key in the chunk
    pub id: String,
    pub project_id: String,
    pub key_ids: Vec<String>,
    pub source_language_id: String,
    pub targets: TargetLanguages,
    #[serde(with = "crate::utils::datetime")]
    pub created_at: DateTime<Utc>,
}

impl DispatchChunk {
    pub fn new(
        project_id: impl Into<String>,
        key_ids: Vec<String>,
        source_language_id: impl Into<String>,
        targets: TargetLanguages,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            key_ids,
            source_language_id: source_language_id.into(),
            targets,
            created_at: Utc::now(),
        }
    }
}

/// Chunk state machine phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkPhase {
    Queued,
    Resolving,
    Dispatching,
    Merging,
    Unlocking,
    Done,
}

/// One failed target language
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LanguageFailure {
    pub language_id: String,
    pub reason: String,
}

/// What happened to a chunk, returned by `BatchDispatcher::run_chunk`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    pub chunk_id: String,
    /// Keys leased for this run
    pub locked: usize,
    /// Leases released in Unlocking
    pub unlocked: usize,
    /// Keys dropped before dispatch (missing, deleted, no source value)
    pub skipped_keys: Vec<String>,
    pub requested_languages: Vec<String>,
    /// language id -> keys written
    pub translated: BTreeMap<String, Vec<String>>,
    /// language id -> keys not written because of a concurrent edit
    pub conflicts: BTreeMap<String, Vec<String>>,
    pub failures: Vec<LanguageFailure>,
    /// Set when the chunk stopped before dispatching (e.g. its project vanished)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aborted: Option<String>,
}

impl DispatchReport {
    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty() && self.aborted.is_none()
    }

    pub fn failed_languages(&self) -> Vec<String> {
        self.failures.iter().map(|f| f.language_id.clone()).collect()
    }

    pub fn translated_count(&self) -> usize {
        self.translated.values().map(Vec::len).sum()
    }
}
