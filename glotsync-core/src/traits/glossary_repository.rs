//! Glossary persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::GlossaryRule;

/// Glossary rule store
///
/// Platform implementation:
/// - `SqliteStore` (`SeaORM`)
#[async_trait]
pub trait GlossaryRepository: Send + Sync {
    /// Every rule of a project, regardless of language scope
    async fn find_by_project(&self, project_id: &str) -> CoreResult<Vec<GlossaryRule>>;

    /// Save rule (new or update)
    async fn save(&self, rule: &GlossaryRule) -> CoreResult<()>;

    /// Delete rule; unknown IDs are ignored
    async fn delete(&self, id: &str) -> CoreResult<()>;
}
