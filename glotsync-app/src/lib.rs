//! Application bootstrap for glotsync.
//!
//! Provides `AppState` (service container), `AppStateBuilder` (adapter injection),
//! `AppConfig` (TOML configuration) and the in-process dispatch worker pool.

pub mod adapters;
pub mod config;
pub mod dispatch;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use glotsync_core::error::{CoreError, CoreResult};
use glotsync_core::services::{
    BatchDispatcher, ContentSyncService, GlossaryService, KeyStoreService, PipelineSettings,
    ServiceContext,
};
use glotsync_core::traits::{
    DispatchQueue, GlossaryRepository, KeyRepository, ProjectRepository, ReferenceRepository,
};
use glotsync_core::types::DispatchReport;
use glotsync_provider::TranslationModel;

pub use config::AppConfig;
pub use dispatch::{ChannelDispatchQueue, ChunkReceiver, WorkerPool};

/// Application state.
///
/// Holds every service and the `ServiceContext`. Front-ends build this once via
/// `AppStateBuilder`, then call `run_startup` to sweep stale leases and start the
/// dispatch workers.
pub struct AppState {
    /// Service context (holds all storage adapters)
    pub ctx: Arc<ServiceContext>,
    /// Key Store
    pub key_store: Arc<KeyStoreService>,
    /// Batch Dispatcher
    pub dispatcher: Arc<BatchDispatcher>,
    /// Glossary Resolver
    pub glossary: GlossaryService,
    /// Locale file export and reconciliation
    pub content_sync: ContentSyncService,
    /// Whether `run_startup` has completed
    pub startup_completed: AtomicBool,
    workers: usize,
    report_sink: Option<mpsc::UnboundedSender<DispatchReport>>,
    receiver: Mutex<Option<ChunkReceiver>>,
    pool: Mutex<Option<WorkerPool>>,
}

impl AppState {
    /// Run the startup sequence: expired lease sweep, then worker start.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn run_startup(&self) -> CoreResult<()> {
        match self.dispatcher.recover_expired_leases().await {
            Ok(0) => log::debug!("No expired leases to recover"),
            Ok(n) => log::info!("Recovered {n} key(s) from abandoned dispatches"),
            Err(e) => log::error!("Failed to sweep expired leases: {e}"),
        }

        if let Some(receiver) = self.receiver.lock().await.take() {
            let pool = WorkerPool::start(
                receiver,
                Arc::clone(&self.dispatcher),
                self.workers,
                self.report_sink.clone(),
            );
            *self.pool.lock().await = Some(pool);
        }

        self.startup_completed.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Wait until every queued chunk has run, then stop the workers.
    pub async fn drain(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.drain().await;
        }
    }

    /// Stop the workers after their current chunk.
    pub async fn shutdown(&self) {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.shutdown().await;
        }
    }
}

/// Builder for constructing `AppState` with platform-specific adapters.
///
/// # Required adapters
/// - `key_repository`, `project_repository`, `glossary_repository`, `reference_repository`
/// - `model` - the translation model
///
/// # Optional
/// - `dispatch_queue` - defaults to a `ChannelDispatchQueue` drained by a `WorkerPool`
/// - `settings` - defaults to `PipelineSettings::default()`
pub struct AppStateBuilder {
    key_repository: Option<Arc<dyn KeyRepository>>,
    project_repository: Option<Arc<dyn ProjectRepository>>,
    glossary_repository: Option<Arc<dyn GlossaryRepository>>,
    reference_repository: Option<Arc<dyn ReferenceRepository>>,
    dispatch_queue: Option<Arc<dyn DispatchQueue>>,
    model: Option<Arc<dyn TranslationModel>>,
    settings: PipelineSettings,
    workers: usize,
    queue_capacity: usize,
    report_sink: Option<mpsc::UnboundedSender<DispatchReport>>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            key_repository: None,
            project_repository: None,
            glossary_repository: None,
            reference_repository: None,
            dispatch_queue: None,
            model: None,
            settings: PipelineSettings::default(),
            workers: 4,
            queue_capacity: 256,
            report_sink: None,
        }
    }

    /// Apply pipeline settings, worker count and queue capacity from `config`.
    #[must_use]
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.settings = config.pipeline_settings();
        self.workers = config.pipeline.workers;
        self.queue_capacity = config.pipeline.queue_capacity;
        self
    }

    /// Use one `SqliteStore` for every repository.
    #[cfg(feature = "sqlite-store")]
    #[must_use]
    pub fn sqlite_store(self, store: Arc<adapters::SqliteStore>) -> Self {
        self.key_repository(Arc::clone(&store) as Arc<dyn KeyRepository>)
            .project_repository(Arc::clone(&store) as Arc<dyn ProjectRepository>)
            .glossary_repository(Arc::clone(&store) as Arc<dyn GlossaryRepository>)
            .reference_repository(store)
    }

    #[must_use]
    pub fn key_repository(mut self, repo: Arc<dyn KeyRepository>) -> Self {
        self.key_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn project_repository(mut self, repo: Arc<dyn ProjectRepository>) -> Self {
        self.project_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn glossary_repository(mut self, repo: Arc<dyn GlossaryRepository>) -> Self {
        self.glossary_repository = Some(repo);
        self
    }

    #[must_use]
    pub fn reference_repository(mut self, repo: Arc<dyn ReferenceRepository>) -> Self {
        self.reference_repository = Some(repo);
        self
    }

    /// Replace the built-in channel queue. No workers are started in that case.
    #[must_use]
    pub fn dispatch_queue(mut self, queue: Arc<dyn DispatchQueue>) -> Self {
        self.dispatch_queue = Some(queue);
        self
    }

    #[must_use]
    pub fn model(mut self, model: Arc<dyn TranslationModel>) -> Self {
        self.model = Some(model);
        self
    }

    #[must_use]
    pub fn settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    #[must_use]
    pub fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Receive a `DispatchReport` for every chunk the workers finish.
    #[must_use]
    pub fn report_sink(mut self, sink: mpsc::UnboundedSender<DispatchReport>) -> Self {
        self.report_sink = Some(sink);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::ValidationError` if required adapters are missing or the
    /// settings are invalid.
    pub fn build(self) -> CoreResult<AppState> {
        let key_repository = self.key_repository.ok_or_else(|| {
            CoreError::ValidationError("key_repository is required".to_string())
        })?;
        let project_repository = self.project_repository.ok_or_else(|| {
            CoreError::ValidationError("project_repository is required".to_string())
        })?;
        let glossary_repository = self.glossary_repository.ok_or_else(|| {
            CoreError::ValidationError("glossary_repository is required".to_string())
        })?;
        let reference_repository = self.reference_repository.ok_or_else(|| {
            CoreError::ValidationError("reference_repository is required".to_string())
        })?;
        let model = self
            .model
            .ok_or_else(|| CoreError::ValidationError("model is required".to_string()))?;
        self.settings.validate()?;
        if self.workers == 0 {
            return Err(CoreError::ValidationError(
                "workers must be at least 1".to_string(),
            ));
        }

        let (dispatch_queue, receiver): (Arc<dyn DispatchQueue>, Option<ChunkReceiver>) =
            match self.dispatch_queue {
                Some(queue) => (queue, None),
                None => {
                    let (queue, receiver) = ChannelDispatchQueue::new(self.queue_capacity);
                    (Arc::new(queue), Some(receiver))
                }
            };

        let ctx = Arc::new(ServiceContext::new(
            key_repository,
            project_repository,
            glossary_repository,
            reference_repository,
            dispatch_queue,
            model,
            self.settings,
        ));

        let dispatcher = Arc::new(BatchDispatcher::new(Arc::clone(&ctx)));
        let key_store = Arc::new(KeyStoreService::new(
            Arc::clone(&ctx),
            Arc::clone(&dispatcher),
        ));
        let glossary = GlossaryService::new(Arc::clone(&ctx));
        let content_sync = ContentSyncService::new(Arc::clone(&ctx), Arc::clone(&key_store));

        Ok(AppState {
            ctx,
            key_store,
            dispatcher,
            glossary,
            content_sync,
            startup_completed: AtomicBool::new(false),
            workers: self.workers,
            report_sink: self.report_sink,
            receiver: Mutex::new(receiver),
            pool: Mutex::new(None),
        })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
