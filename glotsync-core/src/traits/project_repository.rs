//! Workspace / project hierarchy persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::{Language, Namespace, Project, Workspace};

/// Tenancy and project structure
///
/// Platform implementation:
/// - `SqliteStore` (`SeaORM`)
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    async fn find_workspace(&self, id: &str) -> CoreResult<Option<Workspace>>;

    /// Save workspace (new or update)
    async fn save_workspace(&self, workspace: &Workspace) -> CoreResult<()>;

    async fn find_project(&self, id: &str) -> CoreResult<Option<Project>>;

    /// Save project (new or update)
    async fn save_project(&self, project: &Project) -> CoreResult<()>;

    async fn list_projects(&self, workspace_id: &str) -> CoreResult<Vec<Project>>;

    async fn find_namespace(&self, id: &str) -> CoreResult<Option<Namespace>>;

    /// Save namespace (new or update)
    async fn save_namespace(&self, namespace: &Namespace) -> CoreResult<()>;

    async fn list_namespaces(&self, project_id: &str) -> CoreResult<Vec<Namespace>>;

    /// All languages of a project, deleted ones included
    async fn list_languages(&self, project_id: &str) -> CoreResult<Vec<Language>>;

    /// Save language (new or update)
    async fn save_language(&self, language: &Language) -> CoreResult<()>;
}
