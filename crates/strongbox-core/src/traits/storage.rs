// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the relational backend.

use async_trait::async_trait;

use crate::error::StrongboxError;

/// Health reported by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Backend answered a trivial query.
    Healthy,
    /// Backend is reachable but reported a problem.
    Degraded(String),
}

/// Lifecycle of a storage backend.
///
/// Query operations live on the concrete backend; this trait covers opening,
/// probing, and closing it so the binary can manage any backend uniformly.
#[async_trait]
pub trait StorageAdapter: Send + Sync + 'static {
    /// Returns the human-readable name of this backend.
    fn name(&self) -> &str;

    /// Opens the backend and applies schema migrations.
    async fn initialize(&self) -> Result<(), StrongboxError>;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, StrongboxError>;

    /// Flushes pending writes and releases the connection.
    async fn close(&self) -> Result<(), StrongboxError>;
}
