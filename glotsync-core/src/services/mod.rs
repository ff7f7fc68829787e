//! Business services

mod batch_dispatcher;
mod content_sync_service;
mod glossary_service;
mod key_store_service;
mod translation_invoker;

pub use batch_dispatcher::BatchDispatcher;
pub use content_sync_service::{ContentSyncService, ReconcileFailure, ReconcileReport};
pub use glossary_service::GlossaryService;
pub use key_store_service::{KeyStatusView, KeyStoreService};
pub use translation_invoker::{BatchEntry, TranslationBatch, TranslationInvoker};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use glotsync_provider::TranslationModel;

use crate::error::{CoreError, CoreResult};
use crate::traits::{
    DispatchQueue, GlossaryRepository, KeyRepository, ProjectRepository, ReferenceRepository,
};
use crate::types::{CallerIdentity, KeyLease, Language, Project, Workspace};

/// Pipeline tuning knobs
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Keys per dispatch chunk
    pub chunk_size: usize,
    /// How long a dispatch may hold a key before the lease lapses
    pub lease_ttl: Duration,
    /// Target languages translated concurrently within one chunk
    pub max_concurrent_languages: usize,
    /// House style applied to every project, ahead of project rules
    pub style_rules: Vec<String>,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chunk_size: 20,
            lease_ttl: Duration::from_secs(600),
            max_concurrent_languages: 4,
            style_rules: Vec::new(),
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> CoreResult<()> {
        if self.chunk_size == 0 {
            return Err(CoreError::ValidationError(
                "chunk_size must be at least 1".to_string(),
            ));
        }
        if self.max_concurrent_languages == 0 {
            return Err(CoreError::ValidationError(
                "max_concurrent_languages must be at least 1".to_string(),
            ));
        }
        if self.lease_ttl.is_zero() {
            return Err(CoreError::ValidationError(
                "lease_ttl must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub(crate) fn lease_ttl_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.lease_ttl).unwrap_or_else(|_| chrono::Duration::days(365))
    }
}

/// Service context holding every dependency
///
/// The hosting application builds it and injects its storage implementations.
pub struct ServiceContext {
    key_repository: Arc<dyn KeyRepository>,
    project_repository: Arc<dyn ProjectRepository>,
    glossary_repository: Arc<dyn GlossaryRepository>,
    reference_repository: Arc<dyn ReferenceRepository>,
    dispatch_queue: Arc<dyn DispatchQueue>,
    model: Arc<dyn TranslationModel>,
    settings: PipelineSettings,
}

impl ServiceContext {
    /// Build the service context
    #[must_use]
    pub fn new(
        key_repository: Arc<dyn KeyRepository>,
        project_repository: Arc<dyn ProjectRepository>,
        glossary_repository: Arc<dyn GlossaryRepository>,
        reference_repository: Arc<dyn ReferenceRepository>,
        dispatch_queue: Arc<dyn DispatchQueue>,
        model: Arc<dyn TranslationModel>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            key_repository,
            project_repository,
            glossary_repository,
            reference_repository,
            dispatch_queue,
            model,
            settings,
        }
    }

    pub fn key_repository(&self) -> &Arc<dyn KeyRepository> {
        &self.key_repository
    }

    pub fn project_repository(&self) -> &Arc<dyn ProjectRepository> {
        &self.project_repository
    }

    pub fn glossary_repository(&self) -> &Arc<dyn GlossaryRepository> {
        &self.glossary_repository
    }

    pub fn reference_repository(&self) -> &Arc<dyn ReferenceRepository> {
        &self.reference_repository
    }

    pub fn dispatch_queue(&self) -> &Arc<dyn DispatchQueue> {
        &self.dispatch_queue
    }

    pub fn model(&self) -> &Arc<dyn TranslationModel> {
        &self.model
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Project by id, or `ProjectNotFound`
    pub async fn require_project(&self, project_id: &str) -> CoreResult<Project> {
        self.project_repository
            .find_project(project_id)
            .await?
            .ok_or_else(|| CoreError::ProjectNotFound(project_id.to_string()))
    }

    pub async fn require_workspace(&self, workspace_id: &str) -> CoreResult<Workspace> {
        self.project_repository
            .find_workspace(workspace_id)
            .await?
            .ok_or_else(|| CoreError::WorkspaceNotFound(workspace_id.to_string()))
    }

    /// Non-deleted languages of a project
    pub async fn live_languages(&self, project_id: &str) -> CoreResult<Vec<Language>> {
        Ok(self
            .project_repository
            .list_languages(project_id)
            .await?
            .into_iter()
            .filter(|l| !l.deleted)
            .collect())
    }

    /// A non-deleted language of the project, else `LanguageNotFound`
    pub async fn require_language(
        &self,
        project_id: &str,
        language_id: &str,
    ) -> CoreResult<Language> {
        self.live_languages(project_id)
            .await?
            .into_iter()
            .find(|l| l.id == language_id)
            .ok_or_else(|| CoreError::LanguageNotFound(language_id.to_string()))
    }

    /// Check that the caller's organization owns the project.
    pub async fn authorize_project(
        &self,
        identity: &CallerIdentity,
        project_id: &str,
    ) -> CoreResult<Project> {
        let project = self.require_project(project_id).await?;
        let workspace = self.require_workspace(&project.workspace_id).await?;
        if workspace.organization_id != identity.organization_id {
            log::warn!(
                "Caller {} (org {}) denied access to project {project_id}",
                identity.subject,
                identity.organization_id
            );
            return Err(CoreError::PermissionDenied(format!(
                "project {project_id} is not accessible to organization {}",
                identity.organization_id
            )));
        }
        Ok(project)
    }

    /// New lease for `owner` starting now.
    pub fn new_lease(&self, owner: &str) -> KeyLease {
        KeyLease::new(owner, Utc::now(), self.settings.lease_ttl_chrono())
    }
}
