//! Translation key persistence abstract Trait

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreResult;
use crate::types::{
    DispatchStamp, KeyLease, MergeOutcome, MergeWrite, PaginatedResponse, PaginationParams,
    TranslationKey, TranslationValue, UsageScope, ValueWrite,
};

/// Translation key store
///
/// Every mutating method is one atomic unit: the key row, its per-language
/// projection rows and the usage counters change together or not at all.
/// State transitions themselves live on [`TranslationKey`] (`apply_write`,
/// `try_acquire`, `merge_translation`, `release`, ...) so every implementation
/// enforces the same rules.
///
/// Platform implementation:
/// - `SqliteStore` (`SeaORM`, glotsync-app `sqlite-store` feature)
#[async_trait]
pub trait KeyRepository: Send + Sync {
    /// Get a key by ID, including deleted keys
    async fn find_by_id(&self, id: &str) -> CoreResult<Option<TranslationKey>>;

    /// Get several keys; unknown IDs are skipped
    async fn find_by_ids(&self, ids: &[String]) -> CoreResult<Vec<TranslationKey>>;

    /// Find the live key named `key` in a namespace
    async fn find_live_by_name(
        &self,
        project_id: &str,
        namespace_id: &str,
        key: &str,
    ) -> CoreResult<Option<TranslationKey>>;

    /// All live keys of a project, optionally restricted to one namespace, ordered by key
    async fn list_live(
        &self,
        project_id: &str,
        namespace_id: Option<&str>,
    ) -> CoreResult<Vec<TranslationKey>>;

    /// Substring search over key names and values of live keys
    async fn search(
        &self,
        project_id: &str,
        query: &str,
        params: &PaginationParams,
    ) -> CoreResult<PaginatedResponse<TranslationKey>>;

    /// Projection rows of one language, ordered by key
    async fn list_values(
        &self,
        project_id: &str,
        language_id: &str,
    ) -> CoreResult<Vec<TranslationValue>>;

    /// Insert a new key.
    ///
    /// Fails with `DuplicateKey` when a live key with the same name exists in the
    /// namespace and with `QuotaExceeded` when the workspace counter has reached
    /// `key_limit`. Increments the workspace, project and namespace counters.
    async fn insert(&self, key: &TranslationKey, key_limit: Option<u64>) -> CoreResult<()>;

    /// Apply a value write; returns the updated key
    async fn write_value(&self, write: &ValueWrite) -> CoreResult<TranslationKey>;

    /// Remove one language value; returns the updated key
    async fn clear_value(
        &self,
        key_id: &str,
        language_id: &str,
        now: DateTime<Utc>,
    ) -> CoreResult<TranslationKey>;

    /// Lease every eligible key to `lease.owner`; returns the IDs acquired
    async fn acquire_leases(
        &self,
        key_ids: &[String],
        lease: &KeyLease,
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<String>>;

    /// Write translated values for one language in a single atomic step
    async fn merge_translations(
        &self,
        owner: &str,
        language_id: &str,
        writes: &[MergeWrite],
        now: DateTime<Utc>,
    ) -> CoreResult<MergeOutcome>;

    /// Release leases held by `owner`; returns how many were released
    async fn release_leases(
        &self,
        owner: &str,
        key_ids: &[String],
        stamp: &DispatchStamp,
    ) -> CoreResult<usize>;

    /// Clear every lease that expired before `now`
    async fn release_expired_leases(&self, now: DateTime<Utc>) -> CoreResult<usize>;

    /// Soft-delete live keys, drop their projection rows and decrement counters.
    /// Returns the keys that were actually deleted.
    async fn soft_delete(
        &self,
        key_ids: &[String],
        now: DateTime<Utc>,
    ) -> CoreResult<Vec<TranslationKey>>;

    /// Current key count of a scope (0 when never touched)
    async fn usage(&self, scope: &UsageScope) -> CoreResult<u64>;
}
