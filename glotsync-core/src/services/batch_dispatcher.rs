//! Batch translation dispatcher
//!
//! A chunk moves through `Queued -> Resolving -> Dispatching -> Merging -> Unlocking -> Done`.
//! `schedule` performs the Queued step (leases) and hands the chunk to the queue;
//! a worker later calls `run_chunk` for the rest. Unlocking is always reached.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};

use crate::error::{CoreError, CoreResult};
use crate::services::{
    BatchEntry, GlossaryService, ServiceContext, TranslationBatch, TranslationInvoker,
};
use crate::types::{
    ChunkPhase, DispatchChunk, DispatchReport, DispatchStamp, Language, LanguageFailure,
    MergeOutcome, MergeWrite, Project, TargetLanguages,
};

/// Source text of one key plus the target revisions seen at Resolving
struct SourceEntry {
    key_id: String,
    key: String,
    text: String,
    revisions: BTreeMap<String, u64>,
}

/// Output of the Resolving phase
struct ResolvedChunk {
    project: Project,
    source: Language,
    targets: Vec<Language>,
    entries: Vec<SourceEntry>,
}

/// Batch Dispatcher
pub struct BatchDispatcher {
    ctx: Arc<ServiceContext>,
    glossary: GlossaryService,
    invoker: TranslationInvoker,
}

impl BatchDispatcher {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self {
            glossary: GlossaryService::new(Arc::clone(&ctx)),
            invoker: TranslationInvoker::new(Arc::clone(ctx.model())),
            ctx,
        }
    }

    /// Split `key_ids` into chunks and schedule each one; returns the ids of the chunks
    /// that leased at least one key.
    ///
    /// Duplicate ids are collapsed. The source language is the project's primary.
    pub async fn trigger_batch_translation(
        &self,
        project_id: &str,
        key_ids: &[String],
        targets: TargetLanguages,
    ) -> CoreResult<Vec<String>> {
        let project = self.ctx.require_project(project_id).await?;
        if let TargetLanguages::Only(language_ids) = &targets {
            for language_id in language_ids {
                self.ctx.require_language(project_id, language_id).await?;
            }
        }

        let mut seen = HashSet::new();
        let unique: Vec<String> = key_ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut chunk_ids = Vec::new();
        for ids in unique.chunks(self.ctx.settings().chunk_size) {
            let chunk = DispatchChunk::new(
                project_id,
                ids.to_vec(),
                project.primary_language_id.clone(),
                targets.clone(),
            );
            let chunk_id = chunk.id.clone();
            if self.schedule(chunk).await? > 0 {
                chunk_ids.push(chunk_id);
            }
        }

        log::info!(
            "Triggered {} chunk(s) for {} key(s) in project {project_id}",
            chunk_ids.len(),
            unique.len()
        );
        Ok(chunk_ids)
    }

    /// Queued step: lease the chunk's keys, then enqueue it.
    ///
    /// Deleted keys and keys leased live by another chunk are dropped from the chunk.
    /// Returns the number of keys leased. When enqueueing fails the leases are released
    /// and the error is returned.
    pub async fn schedule(&self, mut chunk: DispatchChunk) -> CoreResult<usize> {
        Self::enter(&chunk.id, ChunkPhase::Queued);

        let lease = self.ctx.new_lease(&chunk.id);
        let acquired = self
            .ctx
            .key_repository()
            .acquire_leases(&chunk.key_ids, &lease, Utc::now())
            .await?;

        if acquired.len() < chunk.key_ids.len() {
            log::info!(
                "[chunk {}] {} of {} key(s) unavailable (deleted or leased elsewhere)",
                chunk.id,
                chunk.key_ids.len() - acquired.len(),
                chunk.key_ids.len()
            );
        }
        if acquired.is_empty() {
            return Ok(0);
        }

        chunk.key_ids = acquired;
        let chunk_id = chunk.id.clone();
        let key_ids = chunk.key_ids.clone();

        if let Err(e) = self.ctx.dispatch_queue().enqueue(chunk).await {
            log::error!("[chunk {chunk_id}] Enqueue failed, releasing leases: {e}");
            let stamp = DispatchStamp {
                chunk_id: chunk_id.clone(),
                requested_languages: Vec::new(),
                finished_at: Utc::now(),
            };
            if let Err(release_err) = self
                .ctx
                .key_repository()
                .release_leases(&chunk_id, &key_ids, &stamp)
                .await
            {
                log::error!("[chunk {chunk_id}] Failed to release leases: {release_err}");
            }
            return Err(e);
        }

        Ok(key_ids.len())
    }

    /// Resolving through Unlocking. Never fails; everything is recorded on the report.
    pub async fn run_chunk(&self, chunk: &DispatchChunk) -> DispatchReport {
        let mut report = DispatchReport {
            chunk_id: chunk.id.clone(),
            locked: chunk.key_ids.len(),
            ..DispatchReport::default()
        };

        match self.resolve(chunk, &mut report).await {
            Ok(resolved) => self.dispatch(chunk, &resolved, &mut report).await,
            Err(e) => {
                if e.is_expected() {
                    log::warn!("[chunk {}] Aborted while resolving: {e}", chunk.id);
                } else {
                    log::error!("[chunk {}] Aborted while resolving: {e}", chunk.id);
                }
                report.aborted = Some(e.to_string());
            }
        }

        self.unlock(chunk, &mut report).await;
        Self::enter(&chunk.id, ChunkPhase::Done);

        if !report.failures.is_empty() {
            let err = CoreError::PartialDispatchFailure {
                chunk_id: chunk.id.clone(),
                languages: report.failed_languages(),
            };
            log::warn!("{err}");
        }
        log::info!(
            "[chunk {}] Done: {} value(s) written, {} conflict(s), {}/{} lease(s) released",
            chunk.id,
            report.translated_count(),
            report.conflicts.values().map(Vec::len).sum::<usize>(),
            report.unlocked,
            report.locked
        );
        report
    }

    /// Clear leases left behind by chunks that never finished.
    pub async fn recover_expired_leases(&self) -> CoreResult<usize> {
        let released = self
            .ctx
            .key_repository()
            .release_expired_leases(Utc::now())
            .await?;
        if released > 0 {
            log::info!("Released {released} expired lease(s)");
        }
        Ok(released)
    }

    fn enter(chunk_id: &str, phase: ChunkPhase) {
        log::debug!("[chunk {chunk_id}] -> {phase:?}");
    }

    async fn resolve(
        &self,
        chunk: &DispatchChunk,
        report: &mut DispatchReport,
    ) -> CoreResult<ResolvedChunk> {
        Self::enter(&chunk.id, ChunkPhase::Resolving);

        // The lease may have lapsed while the chunk sat in the queue. Renew it for keys
        // still ours or left unleased; keys taken over by another chunk stay skipped.
        let renewed = self
            .ctx
            .key_repository()
            .acquire_leases(&chunk.key_ids, &self.ctx.new_lease(&chunk.id), Utc::now())
            .await?;
        if renewed.len() < chunk.key_ids.len() {
            log::debug!(
                "[chunk {}] {} key(s) no longer leasable",
                chunk.id,
                chunk.key_ids.len() - renewed.len()
            );
        }

        let project = self.ctx.require_project(&chunk.project_id).await?;
        let languages = self.ctx.live_languages(&project.id).await?;
        let source = languages
            .iter()
            .find(|l| l.id == chunk.source_language_id)
            .cloned()
            .ok_or_else(|| CoreError::LanguageNotFound(chunk.source_language_id.clone()))?;

        let targets: Vec<Language> = languages
            .into_iter()
            .filter(|l| l.id != source.id)
            .filter(|l| match &chunk.targets {
                TargetLanguages::All => true,
                TargetLanguages::Only(ids) => ids.contains(&l.id),
            })
            .collect();
        report.requested_languages = targets.iter().map(|l| l.id.clone()).collect();

        let now = Utc::now();
        let mut entries = Vec::new();
        for key in self
            .ctx
            .key_repository()
            .find_by_ids(&chunk.key_ids)
            .await?
        {
            let holds_lease = key
                .lease
                .as_ref()
                .is_some_and(|l| l.owner == chunk.id && l.is_live(now));
            let text = key.values.get(&source.id).filter(|t| !t.trim().is_empty());
            match (key.is_deleted(), holds_lease, text) {
                (false, true, Some(text)) => entries.push(SourceEntry {
                    key_id: key.id.clone(),
                    key: key.key.clone(),
                    text: text.clone(),
                    revisions: targets
                        .iter()
                        .map(|t| (t.id.clone(), key.revision(&t.id)))
                        .collect(),
                }),
                _ => report.skipped_keys.push(key.id.clone()),
            }
        }
        let found: HashSet<&str> = entries
            .iter()
            .map(|e| e.key_id.as_str())
            .chain(report.skipped_keys.iter().map(String::as_str))
            .collect();
        let missing: Vec<String> = chunk
            .key_ids
            .iter()
            .filter(|id| !found.contains(id.as_str()))
            .cloned()
            .collect();
        report.skipped_keys.extend(missing);

        Ok(ResolvedChunk {
            project,
            source,
            targets,
            entries,
        })
    }

    async fn dispatch(
        &self,
        chunk: &DispatchChunk,
        resolved: &ResolvedChunk,
        report: &mut DispatchReport,
    ) {
        if resolved.entries.is_empty() || resolved.targets.is_empty() {
            log::debug!("[chunk {}] Nothing to translate", chunk.id);
            return;
        }
        Self::enter(&chunk.id, ChunkPhase::Dispatching);

        let concurrency = self.ctx.settings().max_concurrent_languages;
        let results: Vec<(String, CoreResult<MergeOutcome>)> =
            stream::iter(resolved.targets.clone())
                .map(|target| async move {
                    let outcome = self.translate_language(chunk, resolved, &target).await;
                    (target.id, outcome)
                })
                .buffer_unordered(concurrency)
                .collect()
                .await;

        for (language_id, result) in results {
            match result {
                Ok(outcome) => {
                    if !outcome.lost_lease.is_empty() {
                        log::info!(
                            "[chunk {}] {} key(s) left the chunk before merging {language_id}",
                            chunk.id,
                            outcome.lost_lease.len()
                        );
                    }
                    if !outcome.applied.is_empty() {
                        report.translated.insert(language_id.clone(), outcome.applied);
                    }
                    if !outcome.conflicts.is_empty() {
                        report.conflicts.insert(language_id, outcome.conflicts);
                    }
                }
                Err(e) => {
                    if e.is_expected() {
                        log::warn!("[chunk {}] {language_id} failed: {e}", chunk.id);
                    } else {
                        log::error!("[chunk {}] {language_id} failed: {e}", chunk.id);
                    }
                    report.failures.push(LanguageFailure {
                        language_id,
                        reason: e.to_string(),
                    });
                }
            }
        }
        report.failures.sort_by(|a, b| a.language_id.cmp(&b.language_id));
    }

    /// Translate one target language and merge it as soon as it completes.
    async fn translate_language(
        &self,
        chunk: &DispatchChunk,
        resolved: &ResolvedChunk,
        target: &Language,
    ) -> CoreResult<MergeOutcome> {
        let glossary = self.glossary.resolve(&resolved.project.id, &target.id).await?;
        let style_rules = self
            .ctx
            .settings()
            .style_rules
            .iter()
            .chain(&resolved.project.style_rules)
            .cloned()
            .collect();

        let batch = TranslationBatch {
            source_language: resolved.source.clone(),
            target_language: target.clone(),
            entries: resolved
                .entries
                .iter()
                .map(|e| BatchEntry {
                    key_id: e.key_id.clone(),
                    key: e.key.clone(),
                    text: e.text.clone(),
                })
                .collect(),
            glossary,
            style_rules,
        };
        let translated = self.invoker.translate(&batch).await?;

        Self::enter(&chunk.id, ChunkPhase::Merging);
        let writes: Vec<MergeWrite> = resolved
            .entries
            .iter()
            .filter_map(|e| {
                translated.get(&e.key_id).map(|value| MergeWrite {
                    key_id: e.key_id.clone(),
                    value: value.clone(),
                    expected_revision: e.revisions.get(&target.id).copied().unwrap_or_default(),
                })
            })
            .collect();
        if writes.is_empty() {
            return Ok(MergeOutcome::default());
        }

        self.ctx
            .key_repository()
            .merge_translations(&chunk.id, &target.id, &writes, Utc::now())
            .await
    }

    async fn unlock(&self, chunk: &DispatchChunk, report: &mut DispatchReport) {
        Self::enter(&chunk.id, ChunkPhase::Unlocking);
        let stamp = DispatchStamp {
            chunk_id: chunk.id.clone(),
            requested_languages: report.requested_languages.clone(),
            finished_at: Utc::now(),
        };
        match self
            .ctx
            .key_repository()
            .release_leases(&chunk.id, &chunk.key_ids, &stamp)
            .await
        {
            Ok(released) => report.unlocked = released,
            Err(e) => log::error!(
                "[chunk {}] Failed to release leases, they will expire: {e}",
                chunk.id
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::PipelineSettings;
    use crate::test_utils::{
        create_test_services, create_test_services_with, expired_lease_settings, DE, EN, FR,
        NAMESPACE_ID, PROJECT_ID,
    };
    use crate::types::{KeyStatus, LanguageState};

    #[tokio::test]
    async fn create_key_fans_out_to_every_language() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();

        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Locked);

        let reports = t.drain_queue().await;
        assert_eq!(reports.len(), 1);
        let report = &reports[0];
        assert!(report.is_complete_success());
        assert_eq!(report.locked, 1);
        assert_eq!(report.unlocked, 1);
        assert_eq!(report.translated_count(), 2);

        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Active);
        assert!(key.lease.is_none());
        assert_eq!(key.values.get(FR).map(String::as_str), Some("[fr] Welcome"));
        assert_eq!(key.values.get(DE).map(String::as_str), Some("[de] Welcome"));
        assert!(key.is_fresh(FR) && key.is_fresh(DE) && key.is_fresh(EN));
        // one call per target language
        assert_eq!(t.model.calls(), 2);
    }

    #[tokio::test]
    async fn failed_language_stays_stale_and_key_unlocks() {
        let t = create_test_services().await;
        t.model.fail_language("fr").await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();

        let report = t.drain_queue().await.remove(0);
        assert_eq!(report.failed_languages(), vec![FR.to_string()]);
        assert_eq!(report.translated.get(DE).map(Vec::len), Some(1));
        assert!(!report.translated.contains_key(FR));
        assert_eq!(report.locked, report.unlocked);

        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Active);
        assert!(!key.values.contains_key(FR));
        assert!(key.is_fresh(DE));

        let now = Utc::now();
        assert_eq!(key.language_state(FR, now), LanguageState::Failed);
        assert_eq!(key.language_state(DE, now), LanguageState::Fresh);
    }

    #[tokio::test]
    async fn manual_edit_during_dispatch_wins() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let chunk = t.queue.take().await.remove(0);

        let gate = t.model.install_gate().await;
        let dispatcher = Arc::clone(&t.dispatcher);
        let run = tokio::spawn(async move { dispatcher.run_chunk(&chunk).await });

        // first language call is in flight; edit fr by hand meanwhile
        gate.entered.notified().await;
        t.key_store
            .update_value(&key_id, FR, "Bienvenue (relu)")
            .await
            .unwrap();
        // release both language calls
        gate.resume.notify_one();
        gate.entered.notified().await;
        gate.resume.notify_one();

        let report = run.await.unwrap();
        assert_eq!(report.conflicts.get(FR), Some(&vec![key_id.clone()]));
        assert_eq!(report.translated.get(DE), Some(&vec![key_id.clone()]));

        let key = t.store.key(&key_id).await;
        assert_eq!(key.values.get(FR).map(String::as_str), Some("Bienvenue (relu)"));
        assert!(key.is_fresh(FR));
        assert_eq!(key.status, KeyStatus::Active);
    }

    #[tokio::test]
    async fn trigger_dedupes_and_splits_into_chunks() {
        let settings = PipelineSettings {
            chunk_size: 2,
            ..PipelineSettings::default()
        };
        let t = create_test_services_with(settings, None).await;
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            ids.push(
                t.key_store
                    .create_key(PROJECT_ID, NAMESPACE_ID, name, name)
                    .await
                    .unwrap(),
            );
        }
        t.drain_queue().await;

        let requested = vec![ids[0].clone(), ids[1].clone(), ids[0].clone(), ids[2].clone()];
        let chunks = t
            .dispatcher
            .trigger_batch_translation(
                PROJECT_ID,
                &requested,
                TargetLanguages::Only(vec![DE.to_string()]),
            )
            .await
            .unwrap();
        assert_eq!(chunks.len(), 2);

        let queued = t.queue.take().await;
        assert_eq!(queued[0].key_ids, vec![ids[0].clone(), ids[1].clone()]);
        assert_eq!(queued[1].key_ids, vec![ids[2].clone()]);
        assert_eq!(queued[0].source_language_id, EN);

        let calls_before = t.model.calls();
        for chunk in &queued {
            let report = t.dispatcher.run_chunk(chunk).await;
            assert_eq!(report.requested_languages, vec![DE.to_string()]);
            assert_eq!(report.locked, report.unlocked);
        }
        // German only: one call per chunk
        assert_eq!(t.model.calls() - calls_before, 2);
    }

    #[tokio::test]
    async fn trigger_rejects_unknown_target_language() {
        let t = create_test_services().await;
        let result = t
            .dispatcher
            .trigger_batch_translation(
                PROJECT_ID,
                &["k".to_string()],
                TargetLanguages::Only(vec!["lang-xx".to_string()]),
            )
            .await;
        assert!(matches!(result, Err(CoreError::LanguageNotFound(_))));
        assert!(t.queue.take().await.is_empty());
    }

    #[tokio::test]
    async fn enqueue_failure_releases_leases() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        t.drain_queue().await;

        t.queue.set_fail(true).await;
        let result = t
            .dispatcher
            .trigger_batch_translation(PROJECT_ID, &[key_id.clone()], TargetLanguages::All)
            .await;
        assert!(matches!(result, Err(CoreError::QueueError(_))));

        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Active);
        assert!(key.lease.is_none());
    }

    #[tokio::test]
    async fn deleted_key_mid_dispatch_is_skipped_but_released() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let chunk = t.queue.take().await.remove(0);

        assert_eq!(t.key_store.delete_keys(&[key_id.clone()]).await.unwrap(), 1);
        let report = t.dispatcher.run_chunk(&chunk).await;

        assert_eq!(report.skipped_keys, vec![key_id.clone()]);
        assert_eq!(report.locked, 1);
        assert_eq!(report.unlocked, 1);
        assert_eq!(t.model.calls(), 0);

        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Deleted);
        assert!(key.lease.is_none());
    }

    #[tokio::test]
    async fn invalid_response_fails_only_that_language() {
        let t = create_test_services().await;
        t.model.respond_raw("de", "I cannot help with that.").await;
        t.key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();

        let report = t.drain_queue().await.remove(0);
        assert_eq!(report.failed_languages(), vec![DE.to_string()]);
        assert!(report.failures[0].reason.contains("Invalid model response"));
        assert_eq!(report.translated.get(FR).map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn expired_leases_are_recovered() {
        let t = create_test_services_with(expired_lease_settings(), None).await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        assert_eq!(t.dispatcher.recover_expired_leases().await.unwrap(), 1);
        let key = t.store.key(&key_id).await;
        assert_eq!(key.status, KeyStatus::Active);
        assert!(key.lease.is_none());
        assert_eq!(t.dispatcher.recover_expired_leases().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn lease_lapsed_in_queue_is_renewed() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let chunk = t.queue.take().await.remove(0);

        // the worker picks the chunk up only after its lease ran out
        let mut key = t.store.key(&key_id).await;
        if let Some(lease) = key.lease.as_mut() {
            lease.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
        t.store.put_key(key).await;

        let report = t.dispatcher.run_chunk(&chunk).await;
        assert!(report.skipped_keys.is_empty());
        assert!(report.is_complete_success());
        assert_eq!(report.translated_count(), 2);
        assert_eq!(report.unlocked, 1);

        let key = t.store.key(&key_id).await;
        assert_eq!(key.values.get(FR).map(String::as_str), Some("[fr] Welcome"));
        assert_eq!(key.status, KeyStatus::Active);
        assert!(key.lease.is_none());
    }

    #[tokio::test]
    async fn lease_swept_before_run_is_taken_back() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let chunk = t.queue.take().await.remove(0);

        let mut key = t.store.key(&key_id).await;
        if let Some(lease) = key.lease.as_mut() {
            lease.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
        t.store.put_key(key).await;
        assert_eq!(t.dispatcher.recover_expired_leases().await.unwrap(), 1);

        let report = t.dispatcher.run_chunk(&chunk).await;
        assert!(report.skipped_keys.is_empty());
        assert_eq!(report.translated_count(), 2);
        assert_eq!(report.unlocked, 1);
        assert!(t.store.key(&key_id).await.lease.is_none());
    }

    #[tokio::test]
    async fn lapsed_lease_taken_by_another_chunk_is_skipped() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let stale_chunk = t.queue.take().await.remove(0);

        let mut key = t.store.key(&key_id).await;
        if let Some(lease) = key.lease.as_mut() {
            lease.expires_at = Utc::now() - chrono::Duration::seconds(1);
        }
        t.store.put_key(key).await;
        t.dispatcher
            .trigger_batch_translation(PROJECT_ID, &[key_id.clone()], TargetLanguages::All)
            .await
            .unwrap();

        let report = t.dispatcher.run_chunk(&stale_chunk).await;
        assert_eq!(report.skipped_keys, vec![key_id.clone()]);
        assert_eq!(report.unlocked, 0);
        assert_eq!(t.model.calls(), 0);
        assert!(t.store.key(&key_id).await.is_locked(Utc::now()));

        let reports = t.drain_queue().await;
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].translated_count(), 2);
    }

    #[tokio::test]
    async fn chunk_for_vanished_project_aborts_and_unlocks() {
        let t = create_test_services().await;
        let key_id = t
            .key_store
            .create_key(PROJECT_ID, NAMESPACE_ID, "common.welcome", "Welcome")
            .await
            .unwrap();
        let mut chunk = t.queue.take().await.remove(0);
        chunk.project_id = "gone".to_string();

        let report = t.dispatcher.run_chunk(&chunk).await;
        assert!(report.aborted.is_some());
        assert!(!report.is_complete_success());
        assert_eq!(report.unlocked, 1);
        assert!(t.store.key(&key_id).await.lease.is_none());
    }
}
