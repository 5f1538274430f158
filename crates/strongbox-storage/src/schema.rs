// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Idempotent provisioning of the credential tables.
//!
//! Migrations create both tables when the database opens; these functions
//! re-apply the same `IF NOT EXISTS` DDL so callers can assert the schema
//! exists before they write, including inside their own transaction.
//! Provisioning is ordered: the entry store for an owner is only provisioned
//! once that owner's user row exists.

use rusqlite::{Connection, OptionalExtension, params};
use strongbox_core::{StrongboxError, UserId};
use tracing::debug;

use crate::database::Database;

const USERS_DDL: &str = include_str!("../migrations/V1__users.sql");
const SECRET_ENTRIES_DDL: &str = include_str!("../migrations/V2__secret_entries.sql");

/// Create the user table and its unique login index if they are missing.
pub fn ensure_user_table_on(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(USERS_DDL)
}

/// Provision the entry store for `owner` on an open connection or transaction.
///
/// Returns `false` without touching the schema when the owner row does not
/// exist.
pub fn ensure_entry_store_on(conn: &Connection, owner: UserId) -> rusqlite::Result<bool> {
    ensure_user_table_on(conn)?;
    let exists = conn
        .query_row(
            "SELECT 1 FROM users WHERE id = ?1",
            params![owner.0],
            |_| Ok(()),
        )
        .optional()?
        .is_some();
    if exists {
        conn.execute_batch(SECRET_ENTRIES_DDL)?;
    }
    Ok(exists)
}

/// Ensure the user table exists. Safe to call any number of times, concurrently.
pub async fn ensure_user_table(db: &Database) -> Result<(), StrongboxError> {
    db.call(|conn| ensure_user_table_on(conn)).await?;
    debug!("user table ensured");
    Ok(())
}

/// Ensure the entry store for `owner` exists.
///
/// Fails with [`StrongboxError::OwnerNotFound`] when the owner row is absent.
pub async fn ensure_entry_store_for(db: &Database, owner: UserId) -> Result<(), StrongboxError> {
    let exists = db
        .call(move |conn| ensure_entry_store_on(conn, owner))
        .await?;
    if !exists {
        return Err(StrongboxError::OwnerNotFound(owner.0));
    }
    debug!(owner = %owner, "entry store ensured");
    Ok(())
}
