//! 类型定义模块

mod dispatch;
mod glossary;
mod identity;
mod key;
mod patch;
mod project;
mod response;
mod usage;

pub use dispatch::{
    ChunkPhase, DispatchChunk, DispatchReport, LanguageFailure, TargetLanguages,
};
pub use glossary::{GlossaryDirective, GlossaryRule};
pub use identity::CallerIdentity;
pub use key::{
    DispatchStamp, Freshness, KeyLease, KeyStatus, LanguageState, MergeDisposition, MergeOutcome,
    MergeWrite, TranslationKey, TranslationValue, ValueWrite, WriteKind,
};
pub use patch::{AddEntry, ChangePatch, DeleteEntry, ModifyEntry};
pub use project::{Language, Namespace, Project, Workspace};
pub use response::{PaginatedResponse, PaginationParams};
pub use usage::{UsageCounter, UsageScope};

/// Reference to a key held by an external system (e.g. a screenshot annotation)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct KeyReference {
    pub id: String,
    pub key_id: String,
    /// Owning system, e.g. `screenshot`
    pub source: String,
    /// Opaque payload owned by `source`
    pub payload: serde_json::Value,
}
