//! `KeyRepository` implementation for `SqliteStore`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    sea_query::OnConflict, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait,
    QueryFilter, QueryOrder,
};

use glotsync_core::error::{CoreError, CoreResult};
use glotsync_core::traits::KeyRepository;
use glotsync_core::types::{
    DispatchStamp, KeyLease, KeyStatus, MergeDisposition, MergeOutcome, MergeWrite,
    PaginatedResponse, PaginationParams, TranslationKey, TranslationValue, UsageScope,
    ValueWrite,
};

use super::entity::{translation_key, translation_value, usage_counter};
use super::{from_json, parse_time, storage_error, to_json, SqliteStore};

const STATUS_ACTIVE: &str = "active";
const STATUS_LOCKED: &str = "locked";
const STATUS_DELETED: &str = "deleted";

fn status_to_str(status: KeyStatus) -> &'static str {
    match status {
        KeyStatus::Active => STATUS_ACTIVE,
        KeyStatus::Locked => STATUS_LOCKED,
        KeyStatus::Deleted => STATUS_DELETED,
    }
}

fn parse_status(raw: &str) -> CoreResult<KeyStatus> {
    match raw {
        STATUS_ACTIVE => Ok(KeyStatus::Active),
        STATUS_LOCKED => Ok(KeyStatus::Locked),
        STATUS_DELETED => Ok(KeyStatus::Deleted),
        other => Err(CoreError::SerializationError(format!(
            "Unknown key status: {other}"
        ))),
    }
}

impl translation_key::Model {
    /// Convert a `SeaORM` row model into a core `TranslationKey`.
    fn into_key(self) -> CoreResult<TranslationKey> {
        let lease = match (self.lease_owner, self.lease_expires_at) {
            (Some(owner), Some(expires_at)) => Some(KeyLease {
                owner,
                expires_at: parse_time(&expires_at, "lease_expires_at")?,
            }),
            _ => None,
        };
        let last_dispatch = self
            .last_dispatch
            .as_deref()
            .map(|raw| from_json::<DispatchStamp>(raw, "last_dispatch"))
            .transpose()?;

        Ok(TranslationKey {
            values: from_json(&self.values_json, "values")?,
            freshness: from_json(&self.freshness_json, "freshness")?,
            revisions: from_json(&self.revisions_json, "revisions")?,
            status: parse_status(&self.status)?,
            lease,
            last_dispatch,
            version: u64::try_from(self.version).unwrap_or_default(),
            created_at: parse_time(&self.created_at, "created_at")?,
            updated_at: parse_time(&self.updated_at, "updated_at")?,
            id: self.id,
            workspace_id: self.workspace_id,
            project_id: self.project_id,
            namespace_id: self.namespace_id,
            key: self.key,
        })
    }
}

fn key_to_active_model(key: &TranslationKey) -> CoreResult<translation_key::ActiveModel> {
    let version = i64::try_from(key.version).map_err(|_| {
        CoreError::SerializationError(format!("Version of key {} out of range", key.id))
    })?;
    let last_dispatch = key.last_dispatch.as_ref().map(to_json).transpose()?;

    Ok(translation_key::ActiveModel {
        id: Set(key.id.clone()),
        workspace_id: Set(key.workspace_id.clone()),
        project_id: Set(key.project_id.clone()),
        namespace_id: Set(key.namespace_id.clone()),
        key: Set(key.key.clone()),
        status: Set(status_to_str(key.status).to_string()),
        values_json: Set(to_json(&key.values)?),
        freshness_json: Set(to_json(&key.freshness)?),
        revisions_json: Set(to_json(&key.revisions)?),
        lease_owner: Set(key.lease.as_ref().map(|l| l.owner.clone())),
        lease_expires_at: Set(key.lease.as_ref().map(|l| l.expires_at.to_rfc3339())),
        last_dispatch: Set(last_dispatch),
        version: Set(version),
        created_at: Set(key.created_at.to_rfc3339()),
        updated_at: Set(key.updated_at.to_rfc3339()),
    })
}

fn value_to_active_model(row: &TranslationValue) -> translation_value::ActiveModel {
    translation_value::ActiveModel {
        key_id: Set(row.key_id.clone()),
        language_id: Set(row.language_id.clone()),
        project_id: Set(row.project_id.clone()),
        namespace_id: Set(row.namespace_id.clone()),
        key: Set(row.key.clone()),
        value: Set(row.value.clone()),
        fresh: Set(i32::from(row.fresh)),
    }
}

impl From<translation_value::Model> for TranslationValue {
    fn from(row: translation_value::Model) -> Self {
        Self {
            key_id: row.key_id,
            project_id: row.project_id,
            namespace_id: row.namespace_id,
            language_id: row.language_id,
            key: row.key,
            value: row.value,
            fresh: row.fresh != 0,
        }
    }
}

async fn load_key<C: ConnectionTrait>(conn: &C, id: &str) -> CoreResult<Option<TranslationKey>> {
    translation_key::Entity::find_by_id(id.to_string())
        .one(conn)
        .await
        .map_err(storage_error("Failed to query key"))?
        .map(translation_key::Model::into_key)
        .transpose()
}

async fn require_key<C: ConnectionTrait>(conn: &C, id: &str) -> CoreResult<TranslationKey> {
    load_key(conn, id)
        .await?
        .ok_or_else(|| CoreError::KeyNotFound(id.to_string()))
}

/// Upsert the key row and rewrite its projection rows.
async fn persist_key<C: ConnectionTrait>(conn: &C, key: &TranslationKey) -> CoreResult<()> {
    translation_key::Entity::insert(key_to_active_model(key)?)
        .on_conflict(
            OnConflict::column(translation_key::Column::Id)
                .update_columns([
                    translation_key::Column::Key,
                    translation_key::Column::Status,
                    translation_key::Column::ValuesJson,
                    translation_key::Column::FreshnessJson,
                    translation_key::Column::RevisionsJson,
                    translation_key::Column::LeaseOwner,
                    translation_key::Column::LeaseExpiresAt,
                    translation_key::Column::LastDispatch,
                    translation_key::Column::Version,
                    translation_key::Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(storage_error("Failed to save key"))?;

    translation_value::Entity::delete_many()
        .filter(translation_value::Column::KeyId.eq(&key.id))
        .exec(conn)
        .await
        .map_err(storage_error("Failed to clear key values"))?;

    if key.is_deleted() {
        return Ok(());
    }
    let rows: Vec<translation_value::ActiveModel> = TranslationValue::project(key)
        .iter()
        .map(value_to_active_model)
        .collect();
    if rows.is_empty() {
        return Ok(());
    }
    translation_value::Entity::insert_many(rows)
        .exec(conn)
        .await
        .map_err(storage_error("Failed to save key values"))?;
    Ok(())
}

async fn read_counter<C: ConnectionTrait>(conn: &C, scope: &UsageScope) -> CoreResult<i64> {
    Ok(
        usage_counter::Entity::find_by_id((scope.kind().to_string(), scope.id().to_string()))
            .one(conn)
            .await
            .map_err(storage_error("Failed to query usage counter"))?
            .map_or(0, |row| row.translation_keys),
    )
}

/// Add `delta` to the workspace, project and namespace counters of `key`.
async fn adjust_counters<C: ConnectionTrait>(
    conn: &C,
    key: &TranslationKey,
    delta: i64,
) -> CoreResult<()> {
    for scope in UsageScope::for_key(&key.workspace_id, &key.project_id, &key.namespace_id) {
        let current = read_counter(conn, &scope).await?;
        let next = current + delta;
        if next < 0 {
            log::warn!(
                "Usage counter {}:{} would drop below zero; clamping",
                scope.kind(),
                scope.id()
            );
        }
        usage_counter::Entity::insert(usage_counter::ActiveModel {
            scope: Set(scope.kind().to_string()),
            scope_id: Set(scope.id().to_string()),
            translation_keys: Set(next.max(0)),
        })
        .on_conflict(
            OnConflict::columns([usage_counter::Column::Scope, usage_counter::Column::ScopeId])
                .update_column(usage_counter::Column::TranslationKeys)
                .to_owned(),
        )
        .exec(conn)
        .await
        .map_err(storage_error("Failed to update usage counter"))?;
    }
    Ok(())
}

async fn find_live_in<C: ConnectionTrait>(
    conn: &C,
    project_id: &str,
    namespace_id: &str,
    key: &str,
) -> CoreResult<Option<TranslationKey>> {
    translation_key::Entity::find()
        .filter(translation_key::Column::ProjectId.eq(project_id))
        .filter(translation_key::Column::NamespaceId.eq(namespace_id))
        .filter(translation_key::Column::Key.eq(key))
        .filter(translation_key::Column::Status.ne(STATUS_DELETED))
        .one(conn)
        .await
        .map_err(storage_error("Failed to query key by name"))?
        .map(translation_key::Model::into_key)
        .transpose()
}

#[async_trait]
impl KeyRepository for SqliteStore {
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<TranslationKey>> {
        load_key(&self.db, id).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> CoreResult<Vec<TranslationKey>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut by_id: HashMap<String, TranslationKey> = translation_key::Entity::find()
            .filter(translation_key::Column::Id.is_in(ids.to_vec()))
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to query keys"))?
            .into_iter()
            .map(|row| row.into_key().map(|k| (k.id.clone(), k)))
            .collect::<CoreResult<_>>()?;

        // Keep the caller's order
        Ok(ids.iter().filter_map(|id| by_id.remove(id)).collect())
    }

    async fn find_live_by_name(
        &self,
        project_id: &str,
        namespace_id: &str,
        key: &str,
    ) -> CoreResult<Option<TranslationKey>> {
        find_live_in(&self.db, project_id, namespace_id, key).await
    }

    async fn list_live(
        &self,
        project_id: &str,
        namespace_id: Option<&str>,
    ) -> CoreResult<Vec<TranslationKey>> {
        let mut query = translation_key::Entity::find()
            .filter(translation_key::Column::ProjectId.eq(project_id))
            .filter(translation_key::Column::Status.ne(STATUS_DELETED));
        if let Some(namespace_id) = namespace_id {
            query = query.filter(translation_key::Column::NamespaceId.eq(namespace_id));
        }

        query
            .order_by_asc(translation_key::Column::Key)
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to list keys"))?
            .into_iter()
            .map(translation_key::Model::into_key)
            .collect()
    }

    async fn search(
        &self,
        project_id: &str,
        query: &str,
        params: &PaginationParams,
    ) -> CoreResult<PaginatedResponse<TranslationKey>> {
        // Values live in a JSON column, so matching happens after decoding.
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
        let page = matches
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
        let rows = translation_value::Entity::find()
            .filter(translation_value::Column::ProjectId.eq(project_id))
            .filter(translation_value::Column::LanguageId.eq(language_id))
            .order_by_asc(translation_value::Column::Key)
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to list values"))?;

        Ok(rows.into_iter().map(TranslationValue::from).collect())
    }

    async fn insert(&self, key: &TranslationKey, key_limit: Option<u64>) -> CoreResult<()> {
        let (_guard, txn) = self.begin_write().await?;

        if find_live_in(&txn, &key.project_id, &key.namespace_id, &key.key)
            .await?
            .is_some()
        {
            return Err(CoreError::DuplicateKey {
                namespace_id: key.namespace_id.clone(),
                key: key.key.clone(),
            });
        }

        if let Some(limit) = key_limit {
            let used = read_counter(&txn, &UsageScope::Workspace(key.workspace_id.clone())).await?;
            if u64::try_from(used).unwrap_or_default() >= limit {
                return Err(CoreError::QuotaExceeded {
                    workspace_id: key.workspace_id.clone(),
                    limit,
                });
            }
        }

        persist_key(&txn, key).await?;
        adjust_counters(&txn, key, 1).await?;
        txn.commit()
            .await
            .map_err(storage_error("Failed to commit key insert"))
    }

    async fn write_value(&self, write: &ValueWrite) -> CoreResult<TranslationKey> {
        let (_guard, txn) = self.begin_write().await?;

        let mut key = require_key(&txn, &write.key_id).await?;
        key.apply_write(write)?;
        persist_key(&txn, &key).await?;

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit value write"))?;
        Ok(key)
    }

    async fn clear_value(
        &self,
        key_id: &str,
        language_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<TranslationKey> {
        let (_guard, txn) = self.begin_write().await?;

        let mut key = require_key(&txn, key_id).await?;
        key.clear_language(language_id, now)?;
        persist_key(&txn, &key).await?;

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit value clear"))?;
        Ok(key)
    }

    async fn acquire_leases(
        &self,
        key_ids: &[String],
        lease: &KeyLease,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>> {
        let (_guard, txn) = self.begin_write().await?;

        let mut acquired = Vec::with_capacity(key_ids.len());
        for id in key_ids {
            let Some(mut key) = load_key(&txn, id).await? else {
                continue;
            };
            if key.try_acquire(lease, now) {
                persist_key(&txn, &key).await?;
                acquired.push(id.clone());
            }
        }

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit lease acquisition"))?;
        Ok(acquired)
    }

    async fn merge_translations(
        &self,
        owner: &str,
        language_id: &str,
        writes: &[MergeWrite],
        now: DateTime<Utc>,
    ) -> CoreResult<MergeOutcome> {
        let (_guard, txn) = self.begin_write().await?;

        let mut outcome = MergeOutcome::default();
        for write in writes {
            let Some(mut key) = load_key(&txn, &write.key_id).await? else {
                outcome.lost_lease.push(write.key_id.clone());
                continue;
            };
            match key.merge_translation(owner, language_id, write, now) {
                MergeDisposition::Applied => {
                    persist_key(&txn, &key).await?;
                    outcome.applied.push(write.key_id.clone());
                }
                MergeDisposition::Conflict => outcome.conflicts.push(write.key_id.clone()),
                MergeDisposition::LostLease => outcome.lost_lease.push(write.key_id.clone()),
            }
        }

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit merge"))?;
        Ok(outcome)
    }

    async fn release_leases(
        &self,
        owner: &str,
        key_ids: &[String],
        stamp: &DispatchStamp,
    ) -> CoreResult<usize> {
        let (_guard, txn) = self.begin_write().await?;

        let mut released = 0;
        for id in key_ids {
            let Some(mut key) = load_key(&txn, id).await? else {
                continue;
            };
            if key.release(owner, stamp) {
                persist_key(&txn, &key).await?;
                released += 1;
            }
        }

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit lease release"))?;
        Ok(released)
    }

    async fn release_expired_leases(&self, now: DateTime<Utc>) -> CoreResult<usize> {
        let (_guard, txn) = self.begin_write().await?;

        let leased = translation_key::Entity::find()
            .filter(translation_key::Column::LeaseOwner.is_not_null())
            .all(&txn)
            .await
            .map_err(storage_error("Failed to query leased keys"))?;

        let mut released = 0;
        for row in leased {
            let mut key = row.into_key()?;
            if key.release_if_expired(now) {
                persist_key(&txn, &key).await?;
                released += 1;
            }
        }

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit lease sweep"))?;
        Ok(released)
    }

    async fn soft_delete(
        &self,
        key_ids: &[String],
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<TranslationKey>> {
        let (_guard, txn) = self.begin_write().await?;

        let mut deleted = Vec::new();
        for id in key_ids {
            let Some(mut key) = load_key(&txn, id).await? else {
                continue;
            };
            if key.mark_deleted(now) {
                persist_key(&txn, &key).await?;
                adjust_counters(&txn, &key, -1).await?;
                deleted.push(key);
            }
        }

        txn.commit()
            .await
            .map_err(storage_error("Failed to commit key deletion"))?;
        Ok(deleted)
    }

    async fn usage(&self, scope: &UsageScope) -> CoreResult<u64> {
        let count = read_counter(&self.db, scope).await?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
