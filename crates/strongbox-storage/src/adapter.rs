// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use strongbox_config::model::StorageConfig;
use strongbox_core::{HealthStatus, StorageAdapter, StrongboxError};

use crate::database::Database;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle that is opened lazily on the first call to
/// [`StorageAdapter::initialize`]. The vault services take the handle from
/// [`SqliteStorage::database`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns the opened database, or an error if not initialized.
    pub fn database(&self) -> Result<&Database, StrongboxError> {
        self.db
            .get()
            .ok_or_else(|| StrongboxError::unavailable("storage not initialized -- call initialize() first"))
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn initialize(&self) -> Result<(), StrongboxError> {
        let db = Database::open_with(&self.config).await?;
        self.db
            .set(db)
            .map_err(|_| StrongboxError::Internal("storage already initialized".into()))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn health_check(&self) -> Result<HealthStatus, StrongboxError> {
        let db = self.database()?;
        let integrity: String = db
            .call(|conn| conn.query_row("PRAGMA quick_check", [], |row| row.get(0)))
            .await?;
        if integrity == "ok" {
            Ok(HealthStatus::Healthy)
        } else {
            Ok(HealthStatus::Degraded(integrity))
        }
    }

    async fn close(&self) -> Result<(), StrongboxError> {
        let db = self.database()?.clone();
        db.close().await?;
        debug!("WAL checkpoint complete, storage closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        }
    }

    #[tokio::test]
    async fn sqlite_storage_reports_name() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        assert_eq!(storage.name(), "sqlite");
    }

    #[tokio::test]
    async fn initialize_opens_database_at_configured_path() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("init_test.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        assert!(db_path.exists(), "database file should be created");
    }

    #[tokio::test]
    async fn initialize_twice_returns_error() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("double_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        let result = storage.initialize().await;
        assert!(result.is_err(), "second initialize should fail");
    }

    #[tokio::test]
    async fn health_check_returns_healthy_when_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("health.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        storage.initialize().await.unwrap();
        let status = storage.health_check().await.unwrap();
        assert_eq!(status, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn health_check_fails_when_not_initialized() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("no_init.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));

        let err = storage.health_check().await.unwrap_err();
        assert!(err.is_storage_unavailable());
    }

    #[tokio::test]
    async fn operations_after_close_are_unavailable() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("closed.db");
        let storage = SqliteStorage::new(make_config(db_path.to_str().unwrap()));
        storage.initialize().await.unwrap();
        storage.close().await.unwrap();

        let err = storage.health_check().await.unwrap_err();
        assert!(err.is_storage_unavailable(), "got {err:?}");
    }
}
