//! External key reference persistence abstract Trait

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::KeyReference;

/// References other systems hold to keys (screenshot annotations and the like)
#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    async fn save(&self, reference: &KeyReference) -> CoreResult<()>;

    async fn find_by_key(&self, key_id: &str) -> CoreResult<Vec<KeyReference>>;

    /// Remove every reference to the given keys; returns how many were removed
    async fn remove_for_keys(&self, key_ids: &[String]) -> CoreResult<usize>;
}
