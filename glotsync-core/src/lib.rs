//! glotsync Core Library
//!
//! Business logic of the translation propagation pipeline:
//! - Key Store (`KeyStoreService`): keys, values, locks and usage counters
//! - Glossary Resolver (`GlossaryService`)
//! - Translation Invoker (`TranslationInvoker`): one model call per chunk and language
//! - Batch Dispatcher (`BatchDispatcher`): chunking, leases and merge-back
//! - Change-Diff Engine (`diff`) and `ContentSyncService` for source-file reconciliation
//!
//! Storage, the job queue and the model are reached through traits, so the same
//! services run over `SQLite` in the app crate and over in-memory mocks in tests.

pub mod diff;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;
pub mod utils;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use error::{CoreError, CoreResult};
pub use services::{PipelineSettings, ServiceContext};
pub use traits::{
    DispatchQueue, GlossaryRepository, KeyRepository, ProjectRepository, ReferenceRepository,
};
