//! `ReferenceRepository` implementation for `SqliteStore`.

use async_trait::async_trait;
use sea_orm::{sea_query::OnConflict, ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};

use glotsync_core::error::CoreResult;
use glotsync_core::traits::ReferenceRepository;
use glotsync_core::types::KeyReference;

use super::entity::key_reference;
use super::{from_json, storage_error, to_json, SqliteStore};

#[async_trait]
impl ReferenceRepository for SqliteStore {
    async fn save(&self, reference: &KeyReference) -> CoreResult<()> {
        key_reference::Entity::insert(key_reference::ActiveModel {
            id: Set(reference.id.clone()),
            key_id: Set(reference.key_id.clone()),
            source: Set(reference.source.clone()),
            payload: Set(to_json(&reference.payload)?),
        })
        .on_conflict(
            OnConflict::column(key_reference::Column::Id)
                .update_columns([
                    key_reference::Column::KeyId,
                    key_reference::Column::Source,
                    key_reference::Column::Payload,
                ])
                .to_owned(),
        )
        .exec(&self.db)
        .await
        .map_err(storage_error("Failed to save key reference"))?;
        Ok(())
    }

    async fn find_by_key(&self, key_id: &str) -> CoreResult<Vec<KeyReference>> {
        key_reference::Entity::find()
            .filter(key_reference::Column::KeyId.eq(key_id))
            .all(&self.db)
            .await
            .map_err(storage_error("Failed to query key references"))?
            .into_iter()
            .map(|row| {
                Ok(KeyReference {
                    payload: from_json(&row.payload, "payload")?,
                    id: row.id,
                    key_id: row.key_id,
                    source: row.source,
                })
            })
            .collect()
    }

    async fn remove_for_keys(&self, key_ids: &[String]) -> CoreResult<usize> {
        if key_ids.is_empty() {
            return Ok(0);
        }

        let result = key_reference::Entity::delete_many()
            .filter(key_reference::Column::KeyId.is_in(key_ids.to_vec()))
            .exec(&self.db)
            .await
            .map_err(storage_error("Failed to delete key references"))?;

        let removed = usize::try_from(result.rows_affected).unwrap_or(usize::MAX);
        if removed > 0 {
            log::info!("Removed {removed} external references to deleted keys");
        }
        Ok(removed)
    }
}
