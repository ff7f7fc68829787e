//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use glotsync_provider::{CompletionRequest, ProviderError, ProviderMetadata, TranslationModel};
use tokio::sync::{Mutex, Notify, RwLock};

use crate::error::{CoreError, CoreResult};
use crate::services::{BatchDispatcher, KeyStoreService, PipelineSettings, ServiceContext};
use crate::traits::{
    DispatchQueue, GlossaryRepository, KeyRepository, ProjectRepository, ReferenceRepository,
};
use crate::types::{
    DispatchChunk, DispatchStamp, GlossaryRule, KeyLease, KeyReference, Language,
    MergeDisposition, MergeOutcome, MergeWrite, Namespace, PaginatedResponse, PaginationParams,
    Project, TranslationKey, TranslationValue, UsageScope, ValueWrite, Workspace,
};

// ===== MockStore =====

#[derive(Default)]
struct StoreState {
    keys: HashMap<String, TranslationKey>,
    values: BTreeMap<(String, String), TranslationValue>,
    counters: HashMap<UsageScope, u64>,
    workspaces: HashMap<String, Workspace>,
    projects: HashMap<String, Project>,
    namespaces: HashMap<String, Namespace>,
    languages: BTreeMap<String, Language>,
    glossary: BTreeMap<String, GlossaryRule>,
    references: BTreeMap<String, KeyReference>,
}

impl StoreState {
    fn sync_projection(&mut self, key: &TranslationKey) {
        self.values.retain(|(key_id, _), _| key_id != &key.id);
        if key.is_deleted() {
            return;
        }
        for row in TranslationValue::project(key) {
            self.values
                .insert((row.key_id.clone(), row.language_id.clone()), row);
        }
    }

    fn live_key_mut(&mut self, id: &str) -> CoreResult<&mut TranslationKey> {
        self.keys
            .get_mut(id)
            .filter(|k| !k.is_deleted())
            .ok_or_else(|| CoreError::KeyNotFound(id.to_string()))
    }
}

/// In-memory implementation of every repository trait, guarded by one lock.
pub struct MockStore {
    state: RwLock<StoreState>,
    /// 如果 Some，写操作时返回此错误（用于测试失败路径）
    write_error: RwLock<Option<String>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(StoreState::default()),
            write_error: RwLock::new(None),
        }
    }

    pub async fn set_write_error(&self, err: Option<String>) {
        *self.write_error.write().await = err;
    }

    async fn check_write(&self) -> CoreResult<()> {
        match &*self.write_error.read().await {
            Some(msg) => Err(CoreError::StorageError(msg.clone())),
            None => Ok(()),
        }
    }

    /// Overwrite a key as-is, bypassing every check.
    pub async fn put_key(&self, key: TranslationKey) {
        let mut state = self.state.write().await;
        state.sync_projection(&key);
        state.keys.insert(key.id.clone(), key);
    }

    /// Stored key, deleted or not; panics when unknown.
    pub async fn key(&self, id: &str) -> TranslationKey {
        self.state
            .read()
            .await
            .keys
            .get(id)
            .cloned()
            .unwrap_or_else(|| panic!("no key {id}"))
    }

    pub async fn projection(&self, key_id: &str) -> Vec<TranslationValue> {
        self.state
            .read()
            .await
            .values
            .values()
            .filter(|v| v.key_id == key_id)
            .cloned()
            .collect()
    }

    pub async fn all_counters(&self) -> HashMap<UsageScope, u64> {
        self.state.read().await.counters.clone()
    }
}

#[async_trait]
impl KeyRepository for MockStore {
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<TranslationKey>> {
        Ok(self.state.read().await.keys.get(id).cloned())
    }

    async fn find_by_ids(&self, ids: &[String]) -> CoreResult<Vec<TranslationKey>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.keys.get(id).cloned()).collect())
    }

    async fn find_live_by_name(
        &self,
        project_id: &str,
        namespace_id: &str,
        key: &str,
    ) -> CoreResult<Option<TranslationKey>> {
        Ok(self
            .state
            .read()
            .await
            .keys
            .values()
            .find(|k| {
                !k.is_deleted()
                    && k.project_id == project_id
                    && k.namespace_id == namespace_id
                    && k.key == key
            })
            .cloned())
    }

    async fn list_live(
        &self,
        project_id: &str,
        namespace_id: Option<&str>,
    ) -> CoreResult<Vec<TranslationKey>> {
        let mut keys: Vec<TranslationKey> = self
            .state
            .read()
            .await
            .keys
            .values()
            .filter(|k| {
                !k.is_deleted()
                    && k.project_id == project_id
                    && namespace_id.is_none_or(|ns| k.namespace_id == ns)
            })
            .cloned()
            .collect();
        keys.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(keys)
    }

    async fn search(
        &self,
        project_id: &str,
        query: &str,
        params: &PaginationParams,
    ) -> CoreResult<PaginatedResponse<TranslationKey>> {
        let needle = query.to_lowercase();
        let matches: Vec<TranslationKey> = self
            .list_live(project_id, None)
            .await?
            .into_iter()
            .filter(|k| {
                k.key.to_lowercase().contains(&needle)
                    || k.values.values().any(|v| v.to_lowercase().contains(&needle))
            })
            .collect();
        let total = matches.len() as u64;
        let page: Vec<TranslationKey> = matches
            .into_iter()
            .skip(usize::try_from(params.offset()).unwrap_or(usize::MAX))
            .take(params.page_size as usize)
            .collect();
        Ok(PaginatedResponse::new(page, params, total))
    }

    async fn list_values(
        &self,
        project_id: &str,
        language_id: &str,
    ) -> CoreResult<Vec<TranslationValue>> {
        let mut rows: Vec<TranslationValue> = self
            .state
            .read()
            .await
            .values
            .values()
            .filter(|v| v.project_id == project_id && v.language_id == language_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }

    async fn insert(&self, key: &TranslationKey, key_limit: Option<u64>) -> CoreResult<()> {
        self.check_write().await?;
        let mut state = self.state.write().await;

        let duplicate = state.keys.values().any(|k| {
            !k.is_deleted() && k.namespace_id == key.namespace_id && k.key == key.key
        });
        if duplicate {
            return Err(CoreError::DuplicateKey {
                namespace_id: key.namespace_id.clone(),
                key: key.key.clone(),
            });
        }

        let workspace_scope = UsageScope::Workspace(key.workspace_id.clone());
        let current = state.counters.get(&workspace_scope).copied().unwrap_or(0);
        if let Some(limit) = key_limit {
            if current >= limit {
                return Err(CoreError::QuotaExceeded {
                    workspace_id: key.workspace_id.clone(),
                    limit,
                });
            }
        }

        for scope in UsageScope::for_key(&key.workspace_id, &key.project_id, &key.namespace_id) {
            *state.counters.entry(scope).or_insert(0) += 1;
        }
        state.sync_projection(key);
        state.keys.insert(key.id.clone(), key.clone());
        Ok(())
    }

    async fn write_value(&self, write: &ValueWrite) -> CoreResult<TranslationKey> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let key = state.live_key_mut(&write.key_id)?;
        key.apply_write(write)?;
        let key = key.clone();
        state.sync_projection(&key);
        Ok(key)
    }

    async fn clear_value(
        &self,
        key_id: &str,
        language_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<TranslationKey> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let key = state.live_key_mut(key_id)?;
        key.clear_language(language_id, now)?;
        let key = key.clone();
        state.sync_projection(&key);
        Ok(key)
    }

    async fn acquire_leases(
        &self,
        key_ids: &[String],
        lease: &KeyLease,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let mut acquired = Vec::new();
        for id in key_ids {
            if let Some(key) = state.keys.get_mut(id) {
                if key.try_acquire(lease, now) {
                    acquired.push(id.clone());
                }
            }
        }
        Ok(acquired)
    }

    async fn merge_translations(
        &self,
        owner: &str,
        language_id: &str,
        writes: &[MergeWrite],
        now: DateTime<Utc>,
    ) -> CoreResult<MergeOutcome> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let mut outcome = MergeOutcome::default();
        for write in writes {
            let Some(key) = state.keys.get_mut(&write.key_id) else {
                outcome.lost_lease.push(write.key_id.clone());
                continue;
            };
            match key.merge_translation(owner, language_id, write, now) {
                MergeDisposition::Applied => {
                    let key = key.clone();
                    state.sync_projection(&key);
                    outcome.applied.push(write.key_id.clone());
                }
                MergeDisposition::Conflict => outcome.conflicts.push(write.key_id.clone()),
                MergeDisposition::LostLease => outcome.lost_lease.push(write.key_id.clone()),
            }
        }
        Ok(outcome)
    }

    async fn release_leases(
        &self,
        owner: &str,
        key_ids: &[String],
        stamp: &DispatchStamp,
    ) -> CoreResult<usize> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let mut released = 0;
        for id in key_ids {
            if let Some(key) = state.keys.get_mut(id) {
                if key.release(owner, stamp) {
                    released += 1;
                }
            }
        }
        Ok(released)
    }

    async fn release_expired_leases(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let mut state = self.state.write().await;
        Ok(state
            .keys
            .values_mut()
            .map(|k| k.release_if_expired(now))
            .filter(|released| *released)
            .count())
    }

    async fn soft_delete(
        &self,
        key_ids: &[String],
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<TranslationKey>> {
        self.check_write().await?;
        let mut state = self.state.write().await;
        let mut deleted = Vec::new();
        for id in key_ids {
            let Some(key) = state.keys.get_mut(id) else {
                continue;
            };
            if !key.mark_deleted(now) {
                continue;
            }
            let key = key.clone();
            for scope in UsageScope::for_key(&key.workspace_id, &key.project_id, &key.namespace_id)
            {
                let counter = state.counters.entry(scope).or_insert(0);
                *counter = counter.saturating_sub(1);
            }
            state.sync_projection(&key);
            deleted.push(key);
        }
        Ok(deleted)
    }

    async fn usage(&self, scope: &UsageScope) -> CoreResult<u64> {
        Ok(self
            .state
            .read()
            .await
            .counters
            .get(scope)
            .copied()
            .unwrap_or(0))
    }
}

#[async_trait]
impl ProjectRepository for MockStore {
    async fn find_workspace(&self, id: &str) -> CoreResult<Option<Workspace>> {
        Ok(self.state.read().await.workspaces.get(id).cloned())
    }

    async fn save_workspace(&self, workspace: &Workspace) -> CoreResult<()> {
        self.state
            .write()
            .await
            .workspaces
            .insert(workspace.id.clone(), workspace.clone());
        Ok(())
    }

    async fn find_project(&self, id: &str) -> CoreResult<Option<Project>> {
        Ok(self.state.read().await.projects.get(id).cloned())
    }

    async fn save_project(&self, project: &Project) -> CoreResult<()> {
        self.state
            .write()
            .await
            .projects
            .insert(project.id.clone(), project.clone());
        Ok(())
    }

    async fn list_projects(&self, workspace_id: &str) -> CoreResult<Vec<Project>> {
        Ok(self
            .state
            .read()
            .await
            .projects
            .values()
            .filter(|p| p.workspace_id == workspace_id)
            .cloned()
            .collect())
    }

    async fn find_namespace(&self, id: &str) -> CoreResult<Option<Namespace>> {
        Ok(self.state.read().await.namespaces.get(id).cloned())
    }

    async fn save_namespace(&self, namespace: &Namespace) -> CoreResult<()> {
        self.state
            .write()
            .await
            .namespaces
            .insert(namespace.id.clone(), namespace.clone());
        Ok(())
    }

    async fn list_namespaces(&self, project_id: &str) -> CoreResult<Vec<Namespace>> {
        Ok(self
            .state
            .read()
            .await
            .namespaces
            .values()
            .filter(|n| n.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn list_languages(&self, project_id: &str) -> CoreResult<Vec<Language>> {
        Ok(self
            .state
            .read()
            .await
            .languages
            .values()
            .filter(|l| l.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn save_language(&self, language: &Language) -> CoreResult<()> {
        self.state
            .write()
            .await
            .languages
            .insert(language.id.clone(), language.clone());
        Ok(())
    }
}

#[async_trait]
impl GlossaryRepository for MockStore {
    async fn find_by_project(&self, project_id: &str) -> CoreResult<Vec<GlossaryRule>> {
        Ok(self
            .state
            .read()
            .await
            .glossary
            .values()
            .filter(|r| r.project_id == project_id)
            .cloned()
            .collect())
    }

    async fn save(&self, rule: &GlossaryRule) -> CoreResult<()> {
        self.state
            .write()
            .await
            .glossary
            .insert(rule.id.clone(), rule.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> CoreResult<()> {
        self.state.write().await.glossary.remove(id);
        Ok(())
    }
}

#[async_trait]
impl ReferenceRepository for MockStore {
    async fn save(&self, reference: &KeyReference) -> CoreResult<()> {
        self.state
            .write()
            .await
            .references
            .insert(reference.id.clone(), reference.clone());
        Ok(())
    }

    async fn find_by_key(&self, key_id: &str) -> CoreResult<Vec<KeyReference>> {
        Ok(self
            .state
            .read()
            .await
            .references
            .values()
            .filter(|r| r.key_id == key_id)
            .cloned()
            .collect())
    }

    async fn remove_for_keys(&self, key_ids: &[String]) -> CoreResult<usize> {
        let mut state = self.state.write().await;
        let before = state.references.len();
        state.references.retain(|_, r| !key_ids.contains(&r.key_id));
        Ok(before - state.references.len())
    }
}

// ===== RecordingQueue =====

/// Dispatch queue that only records what was enqueued.
pub struct RecordingQueue {
    chunks: Mutex<Vec<DispatchChunk>>,
    fail: RwLock<bool>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self {
            chunks: Mutex::new(Vec::new()),
            fail: RwLock::new(false),
        }
    }

    pub async fn set_fail(&self, fail: bool) {
        *self.fail.write().await = fail;
    }

    pub async fn take(&self) -> Vec<DispatchChunk> {
        std::mem::take(&mut *self.chunks.lock().await)
    }
}

#[async_trait]
impl DispatchQueue for RecordingQueue {
    async fn enqueue(&self, chunk: DispatchChunk) -> CoreResult<()> {
        if *self.fail.read().await {
            return Err(CoreError::QueueError("queue closed".to_string()));
        }
        self.chunks.lock().await.push(chunk);
        Ok(())
    }
}

// ===== MockModel =====

/// Scripted translation model.
///
/// By default every source string `s` is answered with `"[code] s"` for the target
/// language code found in the system prompt.
pub struct MockModel {
    calls: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
    failing: RwLock<HashSet<String>>,
    raw: RwLock<HashMap<String, String>>,
    gate: RwLock<Option<Arc<ModelGate>>>,
}

/// Pauses `complete` until the test lets it continue.
pub struct ModelGate {
    pub entered: Notify,
    pub resume: Notify,
}

impl MockModel {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
            failing: RwLock::new(HashSet::new()),
            raw: RwLock::new(HashMap::new()),
            gate: RwLock::new(None),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Fail every call for this target language code.
    pub async fn fail_language(&self, code: &str) {
        self.failing.write().await.insert(code.to_string());
    }

    /// Answer calls for this target language code with `body` verbatim.
    pub async fn respond_raw(&self, code: &str, body: &str) {
        self.raw
            .write()
            .await
            .insert(code.to_string(), body.to_string());
    }

    pub async fn install_gate(&self) -> Arc<ModelGate> {
        let gate = Arc::new(ModelGate {
            entered: Notify::new(),
            resume: Notify::new(),
        });
        *self.gate.write().await = Some(Arc::clone(&gate));
        gate
    }

    fn target_code(system: &str) -> String {
        system
            .lines()
            .find_map(|l| l.strip_prefix("Target language: "))
            .and_then(|l| l.rsplit_once('(').map(|(_, code)| code.trim_end_matches(')')))
            .unwrap_or_default()
            .to_string()
    }
}

#[async_trait]
impl TranslationModel for MockModel {
    fn id(&self) -> &'static str {
        "mock"
    }

    fn metadata() -> ProviderMetadata {
        unreachable!("mock model has no metadata")
    }

    fn model(&self) -> &str {
        "mock-model"
    }

    async fn complete(&self, request: &CompletionRequest) -> glotsync_provider::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().await.push(request.clone());

        let gate = self.gate.read().await.clone();
        if let Some(gate) = gate {
            gate.entered.notify_one();
            gate.resume.notified().await;
        }

        let code = Self::target_code(&request.system);
        if self.failing.read().await.contains(&code) {
            return Err(ProviderError::NetworkError {
                provider: "mock".to_string(),
                detail: format!("{code} unavailable"),
            });
        }
        if let Some(body) = self.raw.read().await.get(&code) {
            return Ok(body.clone());
        }

        let source: BTreeMap<String, String> =
            serde_json::from_str(&request.user).map_err(|e| ProviderError::ParseError {
                provider: "mock".to_string(),
                detail: e.to_string(),
            })?;
        let translated: BTreeMap<String, String> = source
            .into_iter()
            .map(|(id, text)| (id, format!("[{code}] {text}")))
            .collect();
        serde_json::to_string(&translated).map_err(|e| ProviderError::SerializationError {
            provider: "mock".to_string(),
            detail: e.to_string(),
        })
    }
}

// ===== Fixtures =====

pub const ORG_ID: &str = "org-1";
pub const WORKSPACE_ID: &str = "ws-1";
pub const PROJECT_ID: &str = "proj-1";
pub const NAMESPACE_ID: &str = "ns-common";
pub const EN: &str = "lang-en";
pub const FR: &str = "lang-fr";
pub const DE: &str = "lang-de";

pub fn language(id: &str, code: &str, name: &str) -> Language {
    Language {
        id: id.to_string(),
        project_id: PROJECT_ID.to_string(),
        code: code.to_string(),
        name: name.to_string(),
        deleted: false,
    }
}

/// One workspace, one project (primary `en`, targets `fr` and `de`), one namespace.
pub async fn seed_project(store: &MockStore, key_limit: Option<u64>) {
    store
        .save_workspace(&Workspace {
            id: WORKSPACE_ID.to_string(),
            organization_id: ORG_ID.to_string(),
            name: "Acme".to_string(),
            key_limit,
        })
        .await
        .unwrap();
    store
        .save_project(&Project {
            id: PROJECT_ID.to_string(),
            workspace_id: WORKSPACE_ID.to_string(),
            name: "Web".to_string(),
            primary_language_id: EN.to_string(),
            style_rules: vec![],
        })
        .await
        .unwrap();
    store
        .save_namespace(&Namespace {
            id: NAMESPACE_ID.to_string(),
            project_id: PROJECT_ID.to_string(),
            name: "common".to_string(),
        })
        .await
        .unwrap();
    for lang in [
        language(EN, "en", "English"),
        language(FR, "fr", "French"),
        language(DE, "de", "German"),
    ] {
        store.save_language(&lang).await.unwrap();
    }
}

/// Everything a service test needs, sharing one store.
pub struct TestServices {
    pub store: Arc<MockStore>,
    pub queue: Arc<RecordingQueue>,
    pub model: Arc<MockModel>,
    pub ctx: Arc<ServiceContext>,
    pub dispatcher: Arc<BatchDispatcher>,
    pub key_store: Arc<KeyStoreService>,
}

pub fn create_test_context(
    store: &Arc<MockStore>,
    queue: &Arc<RecordingQueue>,
    model: &Arc<MockModel>,
    settings: PipelineSettings,
) -> Arc<ServiceContext> {
    Arc::new(ServiceContext::new(
        Arc::clone(store) as Arc<dyn KeyRepository>,
        Arc::clone(store) as Arc<dyn ProjectRepository>,
        Arc::clone(store) as Arc<dyn GlossaryRepository>,
        Arc::clone(store) as Arc<dyn ReferenceRepository>,
        Arc::clone(queue) as Arc<dyn DispatchQueue>,
        Arc::clone(model) as Arc<dyn TranslationModel>,
        settings,
    ))
}

pub async fn create_test_services_with(
    settings: PipelineSettings,
    key_limit: Option<u64>,
) -> TestServices {
    let store = Arc::new(MockStore::new());
    let queue = Arc::new(RecordingQueue::new());
    let model = Arc::new(MockModel::new());
    seed_project(&store, key_limit).await;

    let ctx = create_test_context(&store, &queue, &model, settings);
    let dispatcher = Arc::new(BatchDispatcher::new(Arc::clone(&ctx)));
    let key_store = Arc::new(KeyStoreService::new(
        Arc::clone(&ctx),
        Arc::clone(&dispatcher),
    ));

    TestServices {
        store,
        queue,
        model,
        ctx,
        dispatcher,
        key_store,
    }
}

pub async fn create_test_services() -> TestServices {
    create_test_services_with(PipelineSettings::default(), None).await
}

/// Settings with a lease that is already expired when taken.
pub fn expired_lease_settings() -> PipelineSettings {
    PipelineSettings {
        lease_ttl: Duration::from_millis(1),
        ..PipelineSettings::default()
    }
}

impl TestServices {
    /// Run every queued chunk to completion, including chunks queued meanwhile.
    pub async fn drain_queue(&self) -> Vec<crate::types::DispatchReport> {
        let mut reports = Vec::new();
        loop {
            let chunks = self.queue.take().await;
            if chunks.is_empty() {
                return reports;
            }
            for chunk in chunks {
                reports.push(self.dispatcher.run_chunk(&chunk).await);
            }
        }
    }
}
