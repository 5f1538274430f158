// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Secret entry operations.
//!
//! Every statement carries `owner_user_id` in its WHERE clause; there is no
//! entry lookup by id alone. An entry belonging to another owner is
//! indistinguishable from one that does not exist.

use rusqlite::{OptionalExtension, TransactionBehavior, params};
use strongbox_core::{EntryId, EntrySummary, SecretEntry, StrongboxError, UserId};

use crate::database::Database;
use crate::models::{EntryChanges, EntryRecord};
use crate::queries::bytes_column;
use crate::schema;

/// Insert an entry for `owner`, provisioning the entry store first.
///
/// Fails with [`StrongboxError::OwnerNotFound`] when the owner row is absent.
pub async fn insert_entry(
    db: &Database,
    owner: UserId,
    record: EntryRecord,
) -> Result<EntryId, StrongboxError> {
    let inserted = db
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            if !schema::ensure_entry_store_on(&tx, owner)? {
                return Ok(None);
            }
            tx.execute(
                "INSERT INTO secret_entries
                     (owner_user_id, service, account_login, account_password, expire_date)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    owner.0,
                    record.service,
                    record.account_login,
                    record.account_password,
                    record.expire_date
                ],
            )?;
            let id = EntryId(tx.last_insert_rowid());
            tx.commit()?;
            Ok(Some(id))
        })
        .await?;
    inserted.ok_or(StrongboxError::OwnerNotFound(owner.0))
}

/// List `owner`'s entries, newest first. Passwords are not selected.
pub async fn list_entries(
    db: &Database,
    owner: UserId,
) -> Result<Vec<EntrySummary>, StrongboxError> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, service, account_login, created_at, updated_at, expire_date
             FROM secret_entries
             WHERE owner_user_id = ?1
             ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![owner.0], |row| {
            Ok(EntrySummary {
                id: EntryId(row.get(0)?),
                service: row.get(1)?,
                account_login: row.get(2)?,
                created_at: row.get(3)?,
                updated_at: row.get(4)?,
                expire_date: row.get(5)?,
            })
        })?;
        rows.collect()
    })
    .await
}

/// Fetch one of `owner`'s entries including its sealed password.
pub async fn get_entry(
    db: &Database,
    owner: UserId,
    id: EntryId,
) -> Result<Option<SecretEntry>, StrongboxError> {
    db.call(move |conn| {
        conn.query_row(
            "SELECT id, owner_user_id, service, account_login, account_password,
                    created_at, updated_at, expire_date
             FROM secret_entries
             WHERE id = ?1 AND owner_user_id = ?2",
            params![id.0, owner.0],
            |row| {
                Ok(SecretEntry {
                    id: EntryId(row.get(0)?),
                    owner_user_id: UserId(row.get(1)?),
                    service: row.get(2)?,
                    account_login: row.get(3)?,
                    account_password: bytes_column(row, 4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                    expire_date: row.get(7)?,
                })
            },
        )
        .optional()
    })
    .await
}

/// Apply `changes` to one of `owner`'s entries in a single statement.
///
/// Returns `false` when no such entry exists for this owner. An empty change
/// set writes nothing and only reports existence.
pub async fn update_entry(
    db: &Database,
    owner: UserId,
    id: EntryId,
    changes: EntryChanges,
) -> Result<bool, StrongboxError> {
    if changes.is_empty() {
        return entry_exists(db, owner, id).await;
    }
    let (expire_set, expire_value) = match changes.expire_date {
        Some(value) => (true, value),
        None => (false, None),
    };
    let changed = db
        .call(move |conn| {
            conn.execute(
                "UPDATE secret_entries
                 SET service = COALESCE(?3, service),
                     account_login = COALESCE(?4, account_login),
                     account_password = COALESCE(?5, account_password),
                     expire_date = CASE WHEN ?6 THEN ?7 ELSE expire_date END,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND owner_user_id = ?2",
                params![
                    id.0,
                    owner.0,
                    changes.service,
                    changes.account_login,
                    changes.account_password,
                    expire_set,
                    expire_value
                ],
            )
        })
        .await?;
    Ok(changed == 1)
}

/// Delete one of `owner`'s entries. Returns `false` when nothing matched.
pub async fn delete_entry(db: &Database, owner: UserId, id: EntryId) -> Result<bool, StrongboxError> {
    let deleted = db
        .call(move |conn| {
            conn.execute(
                "DELETE FROM secret_entries WHERE id = ?1 AND owner_user_id = ?2",
                params![id.0, owner.0],
            )
        })
        .await?;
    Ok(deleted == 1)
}

/// True when `owner` has an entry with this id.
pub async fn entry_exists(db: &Database, owner: UserId, id: EntryId) -> Result<bool, StrongboxError> {
    db.call(move |conn| {
        conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM secret_entries WHERE id = ?1 AND owner_user_id = ?2)",
            params![id.0, owner.0],
            |row| row.get(0),
        )
    })
    .await
}

/// Every sealed password `owner` has stored, for re-encryption passes.
pub async fn list_entry_passwords(
    db: &Database,
    owner: UserId,
) -> Result<Vec<(EntryId, Vec<u8>)>, StrongboxError> {
    db.call(move |conn| {
        let mut stmt = conn.prepare(
            "SELECT id, account_password FROM secret_entries
             WHERE owner_user_id = ?1 ORDER BY id",
        )?;
        let rows = stmt.query_map(params![owner.0], |row| {
            Ok((EntryId(row.get(0)?), bytes_column(row, 1)?))
        })?;
        rows.collect()
    })
    .await
}

/// Replace an entry's stored password if it still equals `expected`.
///
/// The comparison makes concurrent migrations of the same entry safe: only
/// the first rewrite lands.
pub async fn replace_entry_password(
    db: &Database,
    owner: UserId,
    id: EntryId,
    expected: Vec<u8>,
    replacement: Vec<u8>,
) -> Result<bool, StrongboxError> {
    let changed = db
        .call(move |conn| {
            conn.execute(
                "UPDATE secret_entries
                 SET account_password = ?4,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND owner_user_id = ?2
                   AND CAST(account_password AS BLOB) = ?3",
                params![id.0, owner.0, expected, replacement],
            )
        })
        .await?;
    Ok(changed == 1)
}
