//! Translation key store
//!
//! Owns key lifecycle, values and usage counters. Primary edits lock the key and hand
//! it to the dispatcher; the caller never waits for translation.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::services::{BatchDispatcher, ServiceContext};
use crate::types::{
    DispatchChunk, Freshness, KeyStatus, LanguageState, PaginatedResponse, PaginationParams,
    Project, TargetLanguages, TranslationKey, TranslationValue, UsageScope, ValueWrite,
    WriteKind,
};
use crate::utils::key_path::validate_key;

/// Largest page `search_keys` will return
const MAX_PAGE_SIZE: u32 = 100;

/// Per-language view of one key
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyStatusView {
    pub key_id: String,
    pub key: String,
    pub status: KeyStatus,
    /// language id -> state
    pub languages: BTreeMap<String, LanguageState>,
}

/// Key Store
pub struct KeyStoreService {
    ctx: Arc<ServiceContext>,
    dispatcher: Arc<BatchDispatcher>,
}

impl KeyStoreService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, dispatcher: Arc<BatchDispatcher>) -> Self {
        Self { ctx, dispatcher }
    }

    /// Create a key from its primary-language text.
    ///
    /// The key is created locked with its primary value fresh and every other language
    /// stale, then a fan-out to all project languages is scheduled.
    pub async fn create_key(
        &self,
        project_id: &str,
        namespace_id: &str,
        key: &str,
        primary_value: &str,
    ) -> CoreResult<String> {
        let project = self.ctx.require_project(project_id).await?;
        let key_id = uuid::Uuid::new_v4().to_string();
        let chunk = DispatchChunk::new(
            &project.id,
            vec![key_id.clone()],
            &project.primary_language_id,
            TargetLanguages::All,
        );
        self.insert_key(&project, &key_id, namespace_id, key, primary_value, Some(&chunk.id))
            .await?;
        self.schedule(chunk).await;
        Ok(key_id)
    }

    /// [`create_key`](Self::create_key) without the fan-out; the key is left unlocked
    /// with every other language stale until [`translate_keys`](Self::translate_keys).
    pub(crate) async fn create_key_deferred(
        &self,
        project: &Project,
        namespace_id: &str,
        key: &str,
        primary_value: &str,
    ) -> CoreResult<String> {
        let key_id = uuid::Uuid::new_v4().to_string();
        self.insert_key(project, &key_id, namespace_id, key, primary_value, None)
            .await?;
        Ok(key_id)
    }

    /// Set one language's value of a key.
    ///
    /// Primary edits are rejected with `KeyLocked` while a dispatch holds the key;
    /// otherwise they mark every other language stale and schedule a re-translation.
    /// Other languages are written directly, even while locked, and never dispatch.
    pub async fn update_value(
        &self,
        key_id: &str,
        language_id: &str,
        value: &str,
    ) -> CoreResult<TranslationKey> {
        let key = self.get_key(key_id).await?;
        let project = self.ctx.require_project(&key.project_id).await?;
        self.ctx.require_language(&project.id, language_id).await?;

        if language_id != project.primary_language_id {
            let write = ValueWrite {
                key_id: key_id.to_string(),
                language_id: language_id.to_string(),
                value: value.to_string(),
                kind: WriteKind::Secondary,
                now: Utc::now(),
            };
            let updated = self.ctx.key_repository().write_value(&write).await?;
            log::debug!("Manual {language_id} edit on key {key_id}");
            return Ok(updated);
        }

        let chunk = DispatchChunk::new(
            &project.id,
            vec![key_id.to_string()],
            &project.primary_language_id,
            TargetLanguages::All,
        );
        let updated = self
            .write_primary(&project, key_id, value, Some(&chunk.id))
            .await?;
        self.schedule(chunk).await;
        Ok(updated)
    }

    /// Primary edit without the re-translation; the caller hands the key to
    /// [`translate_keys`](Self::translate_keys) afterwards.
    pub(crate) async fn update_primary_deferred(
        &self,
        project: &Project,
        key_id: &str,
        value: &str,
    ) -> CoreResult<TranslationKey> {
        self.write_primary(project, key_id, value, None).await
    }

    /// Re-translate `key_ids` into every project language in as few chunks as the
    /// chunk size allows. Scheduling failures are logged; the keys stay stale.
    pub async fn translate_keys(&self, project_id: &str, key_ids: &[String]) {
        if key_ids.is_empty() {
            return;
        }
        if let Err(e) = self
            .dispatcher
            .trigger_batch_translation(project_id, key_ids, TargetLanguages::All)
            .await
        {
            log::error!(
                "Failed to schedule translation of {} key(s) in project {project_id}: {e}",
                key_ids.len()
            );
        }
    }

    /// Remove a non-primary value.
    pub async fn clear_value(&self, key_id: &str, language_id: &str) -> CoreResult<TranslationKey> {
        let key = self.get_key(key_id).await?;
        let project = self.ctx.require_project(&key.project_id).await?;
        self.ctx.require_language(&project.id, language_id).await?;
        if language_id == project.primary_language_id {
            return Err(CoreError::ValidationError(
                "The primary value cannot be cleared; delete the key instead".to_string(),
            ));
        }
        self.ctx
            .key_repository()
            .clear_value(key_id, language_id, Utc::now())
            .await
    }

    /// Delete keys; idempotent.
    ///
    /// Returns how many keys were live before the call. External references to the
    /// deleted keys are removed afterwards.
    pub async fn delete_keys(&self, key_ids: &[String]) -> CoreResult<usize> {
        let unique: Vec<String> = key_ids
            .iter()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if unique.is_empty() {
            return Ok(0);
        }

        let deleted = self
            .ctx
            .key_repository()
            .soft_delete(&unique, Utc::now())
            .await?;
        if deleted.is_empty() {
            return Ok(0);
        }

        let deleted_ids: Vec<String> = deleted.iter().map(|k| k.id.clone()).collect();
        let references = self
            .ctx
            .reference_repository()
            .remove_for_keys(&deleted_ids)
            .await?;
        log::info!(
            "Deleted {} key(s), removed {references} external reference(s)",
            deleted.len()
        );
        Ok(deleted.len())
    }

    /// Live key by id
    pub async fn get_key(&self, key_id: &str) -> CoreResult<TranslationKey> {
        self.ctx
            .key_repository()
            .find_by_id(key_id)
            .await?
            .filter(|k| !k.is_deleted())
            .ok_or_else(|| CoreError::KeyNotFound(key_id.to_string()))
    }

    pub async fn list_keys(
        &self,
        project_id: &str,
        namespace_id: Option<&str>,
    ) -> CoreResult<Vec<TranslationKey>> {
        self.ctx.require_project(project_id).await?;
        self.ctx
            .key_repository()
            .list_live(project_id, namespace_id)
            .await
    }

    /// Search key names and values of every language.
    pub async fn search_keys(
        &self,
        project_id: &str,
        query: &str,
        params: &PaginationParams,
    ) -> CoreResult<PaginatedResponse<TranslationKey>> {
        self.ctx.require_project(project_id).await?;
        let params = params.validated(MAX_PAGE_SIZE);
        self.ctx
            .key_repository()
            .search(project_id, query.trim(), &params)
            .await
    }

    /// Every value of one language in a project
    pub async fn list_values(
        &self,
        project_id: &str,
        language_id: &str,
    ) -> CoreResult<Vec<TranslationValue>> {
        self.ctx.require_language(project_id, language_id).await?;
        self.ctx
            .key_repository()
            .list_values(project_id, language_id)
            .await
    }

    /// Fresh / pending / failed / not-requested per project language.
    pub async fn language_states(&self, key_id: &str) -> CoreResult<KeyStatusView> {
        let key = self.get_key(key_id).await?;
        let now = Utc::now();
        let languages = self
            .ctx
            .live_languages(&key.project_id)
            .await?
            .into_iter()
            .map(|l| {
                let state = key.language_state(&l.id, now);
                (l.id, state)
            })
            .collect();
        Ok(KeyStatusView {
            key_id: key.id.clone(),
            key: key.key.clone(),
            status: key.effective_status(now),
            languages,
        })
    }

    pub async fn usage(&self, scope: &UsageScope) -> CoreResult<u64> {
        self.ctx.key_repository().usage(scope).await
    }

    /// Insert a new key; with `lease_owner` the key starts locked by that chunk.
    async fn insert_key(
        &self,
        project: &Project,
        key_id: &str,
        namespace_id: &str,
        key: &str,
        primary_value: &str,
        lease_owner: Option<&str>,
    ) -> CoreResult<()> {
        validate_key(key)?;

        let namespace = self
            .ctx
            .project_repository()
            .find_namespace(namespace_id)
            .await?
            .filter(|ns| ns.project_id == project.id)
            .ok_or_else(|| CoreError::NamespaceNotFound(namespace_id.to_string()))?;
        let workspace = self.ctx.require_workspace(&project.workspace_id).await?;
        let languages = self.ctx.live_languages(&project.id).await?;

        let now = Utc::now();
        let lease = lease_owner.map(|owner| self.ctx.new_lease(owner));
        let mut record = TranslationKey {
            id: key_id.to_string(),
            workspace_id: workspace.id.clone(),
            project_id: project.id.clone(),
            namespace_id: namespace.id.clone(),
            key: key.to_string(),
            values: BTreeMap::new(),
            freshness: languages
                .iter()
                .map(|l| (l.id.clone(), Freshness::Stale))
                .collect(),
            revisions: BTreeMap::new(),
            status: if lease.is_some() {
                KeyStatus::Locked
            } else {
                KeyStatus::Active
            },
            lease,
            last_dispatch: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        record.put_value(&project.primary_language_id, primary_value.to_string());

        self.ctx
            .key_repository()
            .insert(&record, workspace.key_limit)
            .await?;
        log::info!("Created key '{key}' ({key_id}) in namespace {}", namespace.name);
        Ok(())
    }

    async fn write_primary(
        &self,
        project: &Project,
        key_id: &str,
        value: &str,
        lease_owner: Option<&str>,
    ) -> CoreResult<TranslationKey> {
        let language_id = &project.primary_language_id;
        let stale_languages = self
            .ctx
            .live_languages(&project.id)
            .await?
            .into_iter()
            .map(|l| l.id)
            .filter(|id| id != language_id)
            .collect();
        let write = ValueWrite {
            key_id: key_id.to_string(),
            language_id: language_id.clone(),
            value: value.to_string(),
            kind: WriteKind::Primary {
                lease: lease_owner.map(|owner| self.ctx.new_lease(owner)),
                stale_languages,
            },
            now: Utc::now(),
        };

        let updated = match self.ctx.key_repository().write_value(&write).await {
            Ok(updated) => updated,
            Err(e @ CoreError::KeyLocked(_)) => {
                log::warn!("Primary edit of key {key_id} rejected: translation in flight");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        log::info!("Primary value of key '{}' changed", updated.key);
        Ok(updated)
    }

    /// Hand a chunk to the dispatcher. The write already happened, so a scheduling
    /// failure leaves the languages stale instead of failing the caller.
    async fn schedule(&self, chunk: DispatchChunk) {
        let chunk_id = chunk.id.clone();
        if let Err(e) = self.dispatcher.schedule(chunk).await {
            log::error!("Failed to schedule chunk {chunk_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{
        create_test_services, create_test_services_with, DE, EN, FR, NAMESPACE_ID, PROJECT_ID,
        WORKSPACE_ID,
    };
    use crate::services::PipelineSettings;
    use crate::traits::{ProjectRepository, ReferenceRepository};
    use crate::types::KeyReference;

    #[tokio::test]
    async fn create_key_locks_and_counts() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();

        let key = t.key_store.get_key(&key_id).await.unwrap();
        assert_eq!(key.status, KeyStatus::Locked);
        assert!(key.is_fresh(EN));
        assert_eq!(key.freshness.get(FR), Some(&Freshness::Stale));
        assert_eq!(key.freshness.get(DE), Some(&Freshness::Stale));

        // primary projection row written
        let rows = t.store.projection(&key_id).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].language_id, EN);

        for scope in UsageScope::for_key(WORKSPACE_ID, PROJECT_ID, NAMESPACE_ID) {
            assert_eq!(t.key_store.usage(&scope).await.unwrap(), 1);
        }

        let queued = t.queue.take().await;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].key_ids, vec![key_id.clone()]);
        assert_eq!(key.lease.map(|l| l.owner), Some(queued[0].id.clone()));
    }

    #[tokio::test]
    async fn create_key_rejects_bad_input() {
        let t = create_test_services().await;
        let ks = &t.key_store;

        assert!(matches!(
            ks.create_key(PROJECT_ID, NAMESPACE_ID, "common..welcome", "x").await,
            Err(CoreError::ValidationError(_))
        ));
        assert!(matches!(
            ks.create_key("nope", NAMESPACE_ID, "a", "x").await,
            Err(CoreError::ProjectNotFound(_))
        ));
        assert!(matches!(
            ks.create_key(PROJECT_ID, "ns-other", "a", "x").await,
            Err(CoreError::NamespaceNotFound(_))
        ));

        ks.create_key(PROJECT_ID, NAMESPACE_ID, "a", "x").await.unwrap();
        assert!(matches!(
            ks.create_key(PROJECT_ID, NAMESPACE_ID, "a", "y").await,
            Err(CoreError::DuplicateKey { .. })
        ));
    }

    #[tokio::test]
    async fn quota_blocks_creation_until_a_key_is_deleted() {
        let t = create_test_services_with(PipelineSettings::default(), Some(2)).await;
        let ks = &t.key_store;
        let a = ks.create_key(PROJECT_ID, NAMESPACE_ID, "a", "A").await.unwrap();
        ks.create_key(PROJECT_ID, NAMESPACE_ID, "b", "B").await.unwrap();

        let err = ks.create_key(PROJECT_ID, NAMESPACE_ID, "c", "C").await.unwrap_err();
        assert!(matches!(err, CoreError::QuotaExceeded { limit: 2, .. }));
        assert!(err.is_expected());

        ks.delete_keys(&[a]).await.unwrap();
        ks.create_key(PROJECT_ID, NAMESPACE_ID, "c", "C").await.unwrap();
    }

    #[tokio::test]
    async fn deleted_key_name_can_be_reused() {
        let t = create_test_services().await;
        let ks = &t.key_store;
        let first = ks.create_key(PROJECT_ID, NAMESPACE_ID, "a", "A").await.unwrap();
        ks.delete_keys(&[first.clone()]).await.unwrap();
        let second = ks.create_key(PROJECT_ID, NAMESPACE_ID, "a", "A2").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn primary_edit_rejected_while_locked() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();

        let result = t.key_store.update_value(&key_id, EN, "Hello").await;
        assert!(matches!(result, Err(CoreError::KeyLocked(_))));

        t.drain_queue().await;
        let updated = t.key_store.update_value(&key_id, EN, "Hello").await.unwrap();
        assert_eq!(updated.status, KeyStatus::Locked);
        assert_eq!(updated.freshness.get(FR), Some(&Freshness::Stale));
        assert_eq!(updated.freshness.get(DE), Some(&Freshness::Stale));

        let reports = t.drain_queue().await;
        assert_eq!(reports.len(), 1);
        let key = t.key_store.get_key(&key_id).await.unwrap();
        assert_eq!(key.values.get(FR).map(String::as_str), Some("[fr] Hello"));
        assert_eq!(key.status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn secondary_edit_allowed_while_locked_and_never_dispatches() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        t.queue.take().await;

        let updated = t
            .key_store
            .update_value(&key_id, FR, "Bienvenue")
            .await
            .unwrap();
        assert_eq!(updated.status, KeyStatus::Locked);
        assert!(updated.is_fresh(FR));
        assert!(t.queue.take().await.is_empty());
        assert_eq!(t.model.calls(), 0);
    }

    #[tokio::test]
    async fn full_queue_keeps_writes_and_leaves_languages_stale() {
        let t = create_test_services().await;
        t.queue.set_fail(true).await;

        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Active);
        assert!(key.lease.is_none());
        assert!(key.is_fresh(EN));
        assert_eq!(key.freshness.get(FR), Some(&Freshness::Stale));

        // unlocked again, so the next primary edit goes through
        t.key_store.update_value(&key_id, EN, "Hello").await.unwrap();
        let key = t.store.key(&key_id).await;
        assert_eq!(key.values.get(EN).map(String::as_str), Some("Hello"));
        assert_eq!(key.status, KeyStatus::Active);
        assert!(key.lease.is_none());
        assert_eq!(key.language_state(FR, Utc::now()), LanguageState::NotRequested);

        assert!(t.drain_queue().await.is_empty());
        assert_eq!(t.model.calls(), 0);

        t.queue.set_fail(false).await;
        t.key_store.translate_keys(PROJECT_ID, &[key_id.clone()]).await;
        t.drain_queue().await;
        let key = t.store.key(&key_id).await;
        assert_eq!(key.values.get(FR).map(String::as_str), Some("[fr] Hello"));
        assert!(key.is_fresh(DE));
    }

    #[tokio::test]
    async fn update_value_errors() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "a", "A")
            .await
            .unwrap();
        assert!(matches!(
            t.key_store.update_value("missing", FR, "x").await,
            Err(CoreError::KeyNotFound(_))
        ));
        assert!(matches!(
            t.key_store.update_value(&key_id, "lang-xx", "x").await,
            Err(CoreError::LanguageNotFound(_))
        ));

        t.key_store.delete_keys(&[key_id.clone()]).await.unwrap();
        assert!(matches!(
            t.key_store.update_value(&key_id, FR, "x").await,
            Err(CoreError::KeyNotFound(_))
        ));
    }

    #[tokio::test]
    async fn delete_keys_is_idempotent_and_counts_live_only() {
        let t = create_test_services().await;
        let ks = &t.key_store;
        let k1 = ks.create_key(PROJECT_ID, NAMESPACE_ID, "k1", "one").await.unwrap();
        let k2 = ks.create_key(PROJECT_ID, NAMESPACE_ID, "k2", "two").await.unwrap();
        t.drain_queue().await;

        assert_eq!(ks.delete_keys(&[k1.clone()]).await.unwrap(), 1);
        assert_eq!(ks.delete_keys(&[k1.clone(), k2.clone()]).await.unwrap(), 1);
        assert_eq!(ks.delete_keys(&[k1.clone(), k2.clone()]).await.unwrap(), 0);

        for scope in UsageScope::for_key(WORKSPACE_ID, PROJECT_ID, NAMESPACE_ID) {
            assert_eq!(ks.usage(&scope).await.unwrap(), 0);
        }
        assert!(t.store.projection(&k2).await.is_empty());
        assert!(matches!(ks.get_key(&k2).await, Err(CoreError::KeyNotFound(_))));
    }

    #[tokio::test]
    async fn delete_keys_removes_references() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "a", "A")
            .await
            .unwrap();
        t.store
            .save(&KeyReference {
                id: "ref-1".to_string(),
                key_id: key_id.clone(),
                source: "screenshot".to_string(),
                payload: serde_json::json!({"x": 10, "y": 20}),
            })
            .await
            .unwrap();

        t.key_store.delete_keys(&[key_id.clone()]).await.unwrap();
        assert!(t.store.find_by_key(&key_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn counters_sum_across_namespaces() {
        let t = create_test_services().await;
        t.store
            .save_namespace(&crate::types::Namespace {
                id: "ns-settings".to_string(),
                project_id: PROJECT_ID.to_string(),
                name: "settings".to_string(),
            })
            .await
            .unwrap();

        let ks = &t.key_store;
        ks.create_key(PROJECT_ID, NAMESPACE_ID, "a", "A").await.unwrap();
        ks.create_key(PROJECT_ID, NAMESPACE_ID, "b", "B").await.unwrap();
        let c = ks.create_key(PROJECT_ID, "ns-settings", "c", "C").await.unwrap();
        ks.delete_keys(&[c]).await.unwrap();
        ks.create_key(PROJECT_ID, "ns-settings", "d", "D").await.unwrap();

        let ns_total = ks.usage(&UsageScope::Namespace(NAMESPACE_ID.to_string())).await.unwrap()
            + ks.usage(&UsageScope::Namespace("ns-settings".to_string())).await.unwrap();
        let project = ks.usage(&UsageScope::Project(PROJECT_ID.to_string())).await.unwrap();
        let workspace = ks.usage(&UsageScope::Workspace(WORKSPACE_ID.to_string())).await.unwrap();
        assert_eq!(project, 3);
        assert_eq!(ns_total, project);
        assert_eq!(workspace, project);
    }

    #[tokio::test]
    async fn language_states_after_dispatch() {
        let t = create_test_services().await;
        t.model.fail_language("de").await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();

        let pending = t.key_store.language_states(&key_id).await.unwrap();
        assert_eq!(pending.status, KeyStatus::Locked);
        assert_eq!(pending.languages.get(FR), Some(&LanguageState::Pending));

        t.drain_queue().await;
        let view = t.key_store.language_states(&key_id).await.unwrap();
        assert_eq!(view.status, KeyStatus::Active);
        assert_eq!(view.languages.get(EN), Some(&LanguageState::Fresh));
        assert_eq!(view.languages.get(FR), Some(&LanguageState::Fresh));
        assert_eq!(view.languages.get(DE), Some(&LanguageState::Failed));
    }

    #[tokio::test]
    async fn clear_value_and_listing() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        t.drain_queue().await;

        assert_eq!(t.key_store.list_values(PROJECT_ID, FR).await.unwrap().len(), 1);
        assert!(matches!(
            t.key_store.clear_value(&key_id, EN).await,
            Err(CoreError::ValidationError(_))
        ));

        let key = t.key_store.clear_value(&key_id, FR).await.unwrap();
        assert!(!key.values.contains_key(FR));
        assert!(t.key_store.list_values(PROJECT_ID, FR).await.unwrap().is_empty());

        let found = t
            .key_store
            .search_keys(PROJECT_ID, "welc", &PaginationParams::default())
            .await
            .unwrap();
        assert_eq!(found.total_count, 1);
        assert_eq!(
            t.key_store
                .list_keys(PROJECT_ID, Some(NAMESPACE_ID))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
