// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence layer for the Strongbox credential vault.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single
//! background connection via `tokio-rusqlite` with every unit of work bounded
//! by the configured operation timeout, idempotent schema provisioning, and
//! owner-scoped queries for users and secret entries.

pub mod adapter;
pub mod database;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod schema;

pub use adapter::SqliteStorage;
pub use database::Database;
pub use models::*;
