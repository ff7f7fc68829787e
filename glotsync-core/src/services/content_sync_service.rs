//! Content file sync
//!
//! Bridges locale files (`{"common": {"welcome": "Welcome"}}`, or the flat
//! `{"common.welcome": "Welcome"}`) and the key store: `snapshot` exports one namespace
//! and language as a nested tree, `reconcile` replays the diff between two versions of
//! a file as key store operations.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::diff::{canonicalize, diff, key_name, leaf_text, unflatten};
use crate::error::{CoreError, CoreResult};
use crate::services::{KeyStoreService, ServiceContext};
use crate::types::{ChangePatch, Project};

/// One patch entry that could not be applied
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileFailure {
    pub path: String,
    pub reason: String,
}

/// Outcome of `ContentSyncService::reconcile`, by key name
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    pub created: Vec<String>,
    pub updated: Vec<String>,
    pub deleted: Vec<String>,
    pub cleared: Vec<String>,
    pub failures: Vec<ReconcileFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn fail(&mut self, path: &str, error: &CoreError) {
        if error.is_expected() {
            log::warn!("Reconcile skipped '{path}': {error}");
        } else {
            log::error!("Reconcile failed for '{path}': {error}");
        }
        self.failures.push(ReconcileFailure {
            path: path.to_string(),
            reason: error.to_string(),
        });
    }
}

pub struct ContentSyncService {
    ctx: Arc<ServiceContext>,
    key_store: Arc<KeyStoreService>,
}

impl ContentSyncService {
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>, key_store: Arc<KeyStoreService>) -> Self {
        Self { ctx, key_store }
    }

    /// Export the values of one namespace and language as a nested tree.
    pub async fn snapshot(
        &self,
        project_id: &str,
        namespace_id: &str,
        language_id: &str,
    ) -> CoreResult<Map<String, Value>> {
        self.require_namespace(project_id, namespace_id).await?;
        self.ctx.require_language(project_id, language_id).await?;

        let leaves = self
            .ctx
            .key_repository()
            .list_live(project_id, Some(namespace_id))
            .await?
            .into_iter()
            .filter_map(|k| {
                let value = k.values.get(language_id)?.clone();
                Some((k.key, Value::String(value)))
            });
        let (tree, collisions) = unflatten(leaves);
        if !collisions.is_empty() {
            log::warn!(
                "{} key(s) in namespace {namespace_id} shadow a nested group \
                 and were left out: {}",
                collisions.len(),
                collisions.join(", ")
            );
        }
        Ok(tree)
    }

    /// Replay `diff(old, new)` into the key store.
    ///
    /// Both files are first reshaped so that flat and nested spellings of a key match.
    /// For the primary language additions create keys, modifications update the
    /// primary value and deletions delete keys; every touched key is then translated
    /// in chunk-sized batches. For other languages additions and modifications set the
    /// value and deletions clear it. A failing entry is recorded and the rest still run.
    pub async fn reconcile(
        &self,
        project_id: &str,
        namespace_id: &str,
        language_id: &str,
        old: &Map<String, Value>,
        new: &Map<String, Value>,
    ) -> CoreResult<ReconcileReport> {
        let project = self.require_namespace(project_id, namespace_id).await?;
        self.ctx.require_language(project_id, language_id).await?;

        let mut report = ReconcileReport::default();
        let (old, ignored) = canonicalize(old);
        if !ignored.is_empty() {
            log::warn!("Ignoring {} colliding entries of the old file", ignored.len());
        }
        let (new, collisions) = canonicalize(new);
        for path in &collisions {
            let error = CoreError::ValidationError(format!(
                "'{path}' names the same key or group as another entry"
            ));
            report.fail(path, &error);
        }

        let patch = diff(&old, &new);
        log::info!(
            "Reconciling namespace {namespace_id} ({language_id}): \
             {} added, {} modified, {} deleted",
            patch.add.len(),
            patch.modify.len(),
            patch.delete.len()
        );

        let existing: HashMap<String, String> = self
            .ctx
            .key_repository()
            .list_live(project_id, Some(namespace_id))
            .await?
            .into_iter()
            .map(|k| (k.key, k.id))
            .collect();

        if language_id == project.primary_language_id {
            self.reconcile_primary(&project, namespace_id, &patch, &existing, &mut report)
                .await;
        } else {
            self.reconcile_secondary(language_id, &patch, &existing, &mut report)
                .await;
        }
        Ok(report)
    }

    async fn reconcile_primary(
        &self,
        project: &Project,
        namespace_id: &str,
        patch: &ChangePatch,
        existing: &HashMap<String, String>,
        report: &mut ReconcileReport,
    ) {
        let (names, doomed): (Vec<String>, Vec<String>) = patch
            .delete
            .iter()
            .map(|d| key_name(&d.path))
            .filter_map(|name| existing.get(&name).cloned().map(|id| (name, id)))
            .unzip();
        if !doomed.is_empty() {
            match self.key_store.delete_keys(&doomed).await {
                Ok(_) => report.deleted = names,
                Err(e) => names.iter().for_each(|n| report.fail(n, &e)),
            }
        }

        let mut touched = Vec::new();
        for (path, value) in upserts(patch) {
            let name = key_name(path);
            let Some(text) = leaf_text(value) else {
                report.fail(&name, &null_leaf(&name));
                continue;
            };
            let result = match existing.get(&name) {
                Some(key_id) => self
                    .key_store
                    .update_primary_deferred(project, key_id, &text)
                    .await
                    .map(|_| (key_id.clone(), false)),
                None => self
                    .key_store
                    .create_key_deferred(project, namespace_id, &name, &text)
                    .await
                    .map(|key_id| (key_id, true)),
            };
            match result {
                Ok((key_id, created)) => {
                    touched.push(key_id);
                    if created {
                        report.created.push(name);
                    } else {
                        report.updated.push(name);
                    }
                }
                Err(e) => report.fail(&name, &e),
            }
        }

        self.key_store.translate_keys(&project.id, &touched).await;
    }

    async fn reconcile_secondary(
        &self,
        language_id: &str,
        patch: &ChangePatch,
        existing: &HashMap<String, String>,
        report: &mut ReconcileReport,
    ) {
        for entry in &patch.delete {
            let name = key_name(&entry.path);
            let Some(key_id) = existing.get(&name) else {
                continue;
            };
            match self.key_store.clear_value(key_id, language_id).await {
                Ok(_) => report.cleared.push(name),
                Err(e) => report.fail(&name, &e),
            }
        }

        for (path, value) in upserts(patch) {
            let name = key_name(path);
            let Some(key_id) = existing.get(&name) else {
                report.fail(&name, &CoreError::KeyNotFound(name.clone()));
                continue;
            };
            let Some(text) = leaf_text(value) else {
                report.fail(&name, &null_leaf(&name));
                continue;
            };
            match self.key_store.update_value(key_id, language_id, &text).await {
                Ok(_) => report.updated.push(name),
                Err(e) => report.fail(&name, &e),
            }
        }
    }

    async fn require_namespace(
        &self,
        project_id: &str,
        namespace_id: &str,
    ) -> CoreResult<Project> {
        let project = self.ctx.require_project(project_id).await?;
        self.ctx
            .project_repository()
            .find_namespace(namespace_id)
            .await?
            .filter(|ns| ns.project_id == project.id)
            .ok_or_else(|| CoreError::NamespaceNotFound(namespace_id.to_string()))?;
        Ok(project)
    }
}

/// Additions then modifications, as `(path, new value)`.
fn upserts(patch: &ChangePatch) -> impl Iterator<Item = (&String, &Value)> {
    patch
        .add
        .iter()
        .map(|a| (&a.path, &a.new_value))
        .chain(patch.modify.iter().map(|m| (&m.path, &m.new_value)))
}

fn null_leaf(path: &str) -> CoreError {
    CoreError::ValidationError(format!("'{path}' is null; null values are not stored"))
}
