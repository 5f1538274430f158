// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! All statements are serialized through tokio-rusqlite's single background
//! thread. Do NOT create additional Connection instances for writes.
//!
//! Every unit of work goes through [`Database::call`], which bounds it by the
//! configured operation timeout and classifies failures into
//! [`StrongboxError::StorageUnavailable`] (closed, busy, locked, timed out)
//! versus [`StrongboxError::Storage`] (everything else).

use std::path::Path;
use std::time::Duration;

use rusqlite::ErrorCode;
use strongbox_config::model::StorageConfig;
use strongbox_core::StrongboxError;
use tracing::{debug, warn};

use crate::migrations;

/// Handle to the single SQLite connection shared by every query module.
#[derive(Clone)]
pub struct Database {
    conn: tokio_rusqlite::Connection,
    operation_timeout: Duration,
}

impl Database {
    /// Open (or create) the database at `path` with default storage settings.
    pub async fn open(path: &str) -> Result<Self, StrongboxError> {
        Self::open_with(&StorageConfig {
            database_path: path.to_string(),
            ..StorageConfig::default()
        })
        .await
    }

    /// Open (or create) the database described by `config`.
    ///
    /// Creates the parent directory if needed, applies PRAGMAs, and runs
    /// pending migrations before returning.
    pub async fn open_with(config: &StorageConfig) -> Result<Self, StrongboxError> {
        let path = config.database_path.clone();
        if let Some(parent) = Path::new(&path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StrongboxError::StorageUnavailable {
                    message: format!("cannot create database directory {}", parent.display()),
                    source: Some(Box::new(e)),
                })?;
            }
        }

        let conn = tokio_rusqlite::Connection::open(&path)
            .await
            .map_err(|e| StrongboxError::StorageUnavailable {
                message: format!("cannot open database at {path}"),
                source: Some(Box::new(e)),
            })?;

        let db = Self {
            conn,
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
        };
        db.configure(config.wal_mode, Duration::from_millis(config.busy_timeout_ms))
            .await?;
        debug!(path = %path, wal = config.wal_mode, "database opened");
        Ok(db)
    }

    /// Open a private in-memory database. Used by tests and `doctor` probes.
    pub async fn open_in_memory() -> Result<Self, StrongboxError> {
        let conn = tokio_rusqlite::Connection::open_in_memory()
            .await
            .map_err(|e| StrongboxError::StorageUnavailable {
                message: "cannot open in-memory database".into(),
                source: Some(Box::new(e)),
            })?;
        let config = StorageConfig::default();
        let db = Self {
            conn,
            operation_timeout: Duration::from_millis(config.operation_timeout_ms),
        };
        db.configure(false, Duration::from_millis(config.busy_timeout_ms))
            .await?;
        Ok(db)
    }

    async fn configure(&self, wal_mode: bool, busy_timeout: Duration) -> Result<(), StrongboxError> {
        let pending = self.conn.call(move |conn| {
            let setup = (|| -> rusqlite::Result<()> {
                conn.busy_timeout(busy_timeout)?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")?;
                if wal_mode {
                    conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
                }
                Ok(())
            })();
            let outcome = match setup {
                Ok(()) => migrations::run_migrations(conn),
                Err(e) => Err(classify(e)),
            };
            Ok::<_, rusqlite::Error>(outcome)
        });
        self.bounded(pending).await?
    }

    /// Run `function` on the connection thread, bounded by the operation timeout.
    pub async fn call<F, R>(&self, function: F) -> Result<R, StrongboxError>
    where
        F: FnOnce(&mut rusqlite::Connection) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let pending = self
            .conn
            .call(move |conn| Ok::<_, rusqlite::Error>(function(conn)));
        self.bounded(pending).await?.map_err(classify)
    }

    async fn bounded<R>(
        &self,
        pending: impl std::future::Future<Output = Result<R, tokio_rusqlite::Error<rusqlite::Error>>>,
    ) -> Result<R, StrongboxError> {
        match tokio::time::timeout(self.operation_timeout, pending).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StrongboxError::StorageUnavailable {
                message: "database connection is closed".into(),
                source: Some(Box::new(e)),
            }),
            Err(_) => {
                warn!(timeout_ms = self.operation_timeout.as_millis() as u64, "storage operation timed out");
                Err(StrongboxError::unavailable(format!(
                    "operation exceeded {} ms",
                    self.operation_timeout.as_millis()
                )))
            }
        }
    }

    /// Checkpoint the WAL and close the connection.
    ///
    /// Later calls on any clone of this handle fail with `StorageUnavailable`.
    pub async fn close(self) -> Result<(), StrongboxError> {
        self.call(|conn| conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);"))
            .await?;
        self.conn
            .close()
            .await
            .map_err(|e| StrongboxError::StorageUnavailable {
                message: "database did not close cleanly".into(),
                source: Some(Box::new(e)),
            })?;
        debug!("database closed");
        Ok(())
    }
}

/// Map a rusqlite error onto the storage error taxonomy.
pub(crate) fn classify(e: rusqlite::Error) -> StrongboxError {
    let transient = matches!(
        e.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::CannotOpen)
    );
    if transient {
        StrongboxError::StorageUnavailable {
            message: e.to_string(),
            source: Some(Box::new(e)),
        }
    } else {
        StrongboxError::Storage {
            source: Box::new(e),
        }
    }
}

/// True when `e` is a UNIQUE constraint violation.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    match e {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        }
        _ => false,
    }
}
