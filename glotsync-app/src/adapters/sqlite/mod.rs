//! SQLite-based unified store using `SeaORM`.
//!
//! A single `SqliteStore` implements `KeyRepository`, `ProjectRepository`,
//! `GlossaryRepository` and `ReferenceRepository` against one database file.
//! Key rows hold the canonical state; `translation_values` is a projection
//! rewritten in the same transaction as every key write.

mod glossary_repo;
mod key_repo;
mod project_repo;
mod reference_repo;
pub(crate) mod entity;
mod migration;

use std::path::Path;

use chrono::{DateTime, Utc};
use glotsync_core::error::{CoreError, CoreResult};
use sea_orm::{Database, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use sea_orm_migration::MigratorTrait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};

use migration::Migrator;

/// SQLite-based store for every repository trait of `glotsync-core`.
///
/// Mutations run inside a transaction and are serialized by `write_lock`, so a
/// read-modify-write on a key row never interleaves with another writer.
pub struct SqliteStore {
    /// Shared `SeaORM` database connection.
    pub(crate) db: DatabaseConnection,
    write_lock: Mutex<()>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path` and run migrations.
    ///
    /// # Errors
    /// Returns `CoreError::StorageError` if directory creation, database
    /// connection, or schema migration fails.
    pub async fn new(db_path: &Path) -> CoreResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CoreError::StorageError(format!("Failed to create directory: {e}")))?;
        }

        let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
        let db = Database::connect(&db_url)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to connect to SQLite: {e}")))?;

        let store = Self {
            db,
            write_lock: Mutex::new(()),
        };

        Migrator::up(&store.db, None)
            .await
            .map_err(|e| CoreError::StorageError(format!("Failed to run migrations: {e}")))?;

        log::info!("Opened SQLite store at {}", db_path.display());
        Ok(store)
    }

    /// Take the writer lock and open a transaction. Dropping the transaction
    /// without `commit` rolls it back.
    async fn begin_write(&self) -> CoreResult<(MutexGuard<'_, ()>, DatabaseTransaction)> {
        let guard = self.write_lock.lock().await;
        let txn = self
            .db
            .begin()
            .await
            .map_err(storage_error("Failed to begin transaction"))?;
        Ok((guard, txn))
    }
}

fn storage_error(context: &'static str) -> impl FnOnce(DbErr) -> CoreError {
    move |e| CoreError::StorageError(format!("{context}: {e}"))
}

fn parse_time(raw: &str, field: &str) -> CoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field}: {e}")))
}

fn from_json<T: DeserializeOwned>(raw: &str, field: &str) -> CoreResult<T> {
    serde_json::from_str(raw)
        .map_err(|e| CoreError::SerializationError(format!("Invalid {field} JSON: {e}")))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CoreResult<String> {
    serde_json::to_string(value).map_err(|e| CoreError::SerializationError(e.to_string()))
}
