// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! User row operations: registration, lookup, and lockout bookkeeping.
//!
//! The failed-attempt counter is only ever changed by a single conditional
//! UPDATE, so concurrent logins against the same account cannot lose an
//! increment or unlock a locked row.

use rusqlite::{OptionalExtension, TransactionBehavior, params};
use strongbox_core::{AccountStatus, StrongboxError, User, UserId};

use crate::database::{Database, is_unique_violation};
use crate::models::{CredentialUpdate, FailedAttempt, LegacyUpgrade};
use crate::queries::bytes_column;
use crate::schema;

const USER_COLUMNS: &str = "id, login, secured_password, kdf_salt, kdf_params, \
                            failed_attempts, is_locked, created_at, updated_at";

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(row.get(0)?),
        login: row.get(1)?,
        secured_password: bytes_column(row, 2)?,
        kdf_salt: row.get(3)?,
        kdf_params: row.get(4)?,
        failed_attempts: row.get(5)?,
        is_locked: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

/// Insert a user and provision its entry store in one transaction.
///
/// Returns `None` when the login is already taken (compared case-insensitively).
pub async fn register_user(
    db: &Database,
    login: &str,
    credentials: CredentialUpdate,
) -> Result<Option<UserId>, StrongboxError> {
    let login = login.to_string();
    let owner = db
        .call(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            schema::ensure_user_table_on(&tx)?;
            let inserted = tx.execute(
                "INSERT INTO users (login, secured_password, kdf_salt, kdf_params)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    login,
                    credentials.secured_password,
                    credentials.kdf_salt,
                    credentials.kdf_params
                ],
            );
            match inserted {
                Ok(_) => {}
                Err(e) if is_unique_violation(&e) => return Ok(None),
                Err(e) => return Err(e),
            }
            let id = UserId(tx.last_insert_rowid());
            if !schema::ensure_entry_store_on(&tx, id)? {
                return Err(rusqlite::Error::QueryReturnedNoRows);
            }
            tx.commit()?;
            Ok(Some(id))
        })
        .await?;
    Ok(owner)
}

/// Look up a user by login, ignoring ASCII case.
pub async fn find_by_login(db: &Database, login: &str) -> Result<Option<User>, StrongboxError> {
    let login = login.to_string();
    db.call(move |conn| {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE login = ?1"),
            params![login],
            user_from_row,
        )
        .optional()
    })
    .await
}

/// Fetch a user by id.
pub async fn get_user(db: &Database, id: UserId) -> Result<Option<User>, StrongboxError> {
    db.call(move |conn| {
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.0],
            user_from_row,
        )
        .optional()
    })
    .await
}

/// Count one failed login, locking the account when the count reaches `threshold`.
///
/// Locked rows are left untouched.
pub async fn record_failed_attempt(
    db: &Database,
    id: UserId,
    threshold: u32,
) -> Result<FailedAttempt, StrongboxError> {
    let row: Option<(u32, bool)> = db
        .call(move |conn| {
            conn.query_row(
                "UPDATE users
                 SET failed_attempts = failed_attempts + 1,
                     is_locked = CASE WHEN failed_attempts + 1 >= ?2 THEN 1 ELSE 0 END,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND is_locked = 0
                 RETURNING failed_attempts, is_locked",
                params![id.0, threshold],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()
        })
        .await?;

    Ok(match row {
        None => FailedAttempt::AlreadyLocked,
        Some((failed_attempts, true)) => FailedAttempt::LockedNow { failed_attempts },
        Some((failed_attempts, false)) => FailedAttempt::Counted { failed_attempts },
    })
}

/// Reset the failed-attempt counter after a successful login.
///
/// Returns `false` if the account was locked in the meantime.
pub async fn reset_failed_attempts(db: &Database, id: UserId) -> Result<bool, StrongboxError> {
    let changed = db
        .call(move |conn| {
            conn.execute(
                "UPDATE users
                 SET failed_attempts = 0,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND is_locked = 0",
                params![id.0],
            )
        })
        .await?;
    Ok(changed == 1)
}

/// Reset the counter and replace a legacy plaintext credential in one transaction.
///
/// The credential is only replaced while it still equals `legacy_value`. When
/// another upgrade got there first the transaction is rolled back and
/// [`LegacyUpgrade::Superseded`] is returned, so the caller must re-read the row.
pub async fn reset_and_upgrade(
    db: &Database,
    id: UserId,
    legacy_value: Vec<u8>,
    credentials: CredentialUpdate,
) -> Result<LegacyUpgrade, StrongboxError> {
    db.call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let reset = tx.execute(
            "UPDATE users
             SET failed_attempts = 0,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
             WHERE id = ?1 AND is_locked = 0",
            params![id.0],
        )?;
        if reset == 0 {
            return Ok(LegacyUpgrade::Locked);
        }
        let replaced = tx.execute(
            "UPDATE users
             SET secured_password = ?2, kdf_salt = ?3, kdf_params = ?4
             WHERE id = ?1 AND CAST(secured_password AS BLOB) = ?5",
            params![
                id.0,
                credentials.secured_password,
                credentials.kdf_salt,
                credentials.kdf_params,
                legacy_value
            ],
        )?;
        if replaced == 0 {
            tx.rollback()?;
            return Ok(LegacyUpgrade::Superseded);
        }
        tx.commit()?;
        Ok(LegacyUpgrade::Upgraded)
    })
    .await
}

/// Replace the credential of an active account if it still equals `current`.
///
/// Returns `false` when the account is locked or the credential changed underneath.
pub async fn replace_credentials(
    db: &Database,
    id: UserId,
    current: Vec<u8>,
    credentials: CredentialUpdate,
) -> Result<bool, StrongboxError> {
    let changed = db
        .call(move |conn| {
            conn.execute(
                "UPDATE users
                 SET secured_password = ?2, kdf_salt = ?3, kdf_params = ?4,
                     failed_attempts = 0,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND is_locked = 0 AND secured_password = ?5",
                params![
                    id.0,
                    credentials.secured_password,
                    credentials.kdf_salt,
                    credentials.kdf_params,
                    current
                ],
            )
        })
        .await?;
    Ok(changed == 1)
}

/// Lock state and counter for `login`, if registered.
pub async fn account_status(
    db: &Database,
    login: &str,
) -> Result<Option<AccountStatus>, StrongboxError> {
    Ok(find_by_login(db, login).await?.map(|user| AccountStatus {
        user_id: user.id,
        state: user.state(),
        login: user.login,
        failed_attempts: user.failed_attempts,
        updated_at: user.updated_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_core::AccountState;

    fn creds(tag: u8) -> CredentialUpdate {
        CredentialUpdate {
            secured_password: vec![tag; 48],
            kdf_salt: vec![tag; 16],
            kdf_params: r#"{"memory_cost":8192,"iterations":1,"parallelism":1}"#.into(),
        }
    }

    async fn setup() -> (Database, UserId) {
        let db = Database::open_in_memory().await.unwrap();
        let id = register_user(&db, "alice", creds(1)).await.unwrap().unwrap();
        (db, id)
    }

    #[tokio::test]
    async fn register_and_find_user() {
        let (db, id) = setup().await;
        let user = find_by_login(&db, "alice").await.unwrap().unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.secured_password, vec![1; 48]);
        assert_eq!(user.kdf_salt.as_deref(), Some(&[1u8; 16][..]));
        assert_eq!(user.failed_attempts, 0);
        assert!(!user.is_locked);
        assert!(user.created_at.ends_with('Z'));
    }

    #[tokio::test]
    async fn duplicate_login_is_reported_case_insensitively() {
        let (db, _) = setup().await;
        assert_eq!(register_user(&db, "ALICE", creds(2)).await.unwrap(), None);
        assert!(find_by_login(&db, "Alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_login_is_none() {
        let (db, _) = setup().await;
        assert!(find_by_login(&db, "mallory").await.unwrap().is_none());
        assert!(account_status(&db, "mallory").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn fifth_failure_locks_account() {
        let (db, id) = setup().await;
        for n in 1..=4 {
            assert_eq!(
                record_failed_attempt(&db, id, 5).await.unwrap(),
                FailedAttempt::Counted { failed_attempts: n }
            );
        }
        assert_eq!(
            record_failed_attempt(&db, id, 5).await.unwrap(),
            FailedAttempt::LockedNow { failed_attempts: 5 }
        );
        assert_eq!(
            record_failed_attempt(&db, id, 5).await.unwrap(),
            FailedAttempt::AlreadyLocked
        );

        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.failed_attempts, 5);
        assert_eq!(user.state(), AccountState::Locked);
    }

    #[tokio::test]
    async fn reset_clears_counter_but_never_unlocks() {
        let (db, id) = setup().await;
        record_failed_attempt(&db, id, 5).await.unwrap();
        record_failed_attempt(&db, id, 5).await.unwrap();
        assert!(reset_failed_attempts(&db, id).await.unwrap());
        assert_eq!(get_user(&db, id).await.unwrap().unwrap().failed_attempts, 0);

        for _ in 0..5 {
            record_failed_attempt(&db, id, 5).await.unwrap();
        }
        assert!(!reset_failed_attempts(&db, id).await.unwrap());
        let user = get_user(&db, id).await.unwrap().unwrap();
        assert!(user.is_locked);
        assert_eq!(user.failed_attempts, 5);
    }

    #[tokio::test]
    async fn concurrent_failures_are_all_counted() {
        let (db, id) = setup().await;
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let db = db.clone();
                tokio::spawn(async move { record_failed_attempt(&db, id, 5).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }
        assert_eq!(get_user(&db, id).await.unwrap().unwrap().failed_attempts, 4);
    }

    #[tokio::test]
    async fn legacy_text_password_is_readable_and_upgradable() {
        let db = Database::open_in_memory().await.unwrap();
        let id = db
            .call(|conn| {
                conn.execute(
                    "INSERT INTO users (login, secured_password, failed_attempts)
                     VALUES ('legacy', 'hunter2', 2)",
                    [],
                )?;
                Ok(UserId(conn.last_insert_rowid()))
            })
            .await
            .unwrap();

        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.secured_password, b"hunter2");
        assert!(user.kdf_salt.is_none());

        assert_eq!(
            reset_and_upgrade(&db, id, b"hunter2".to_vec(), creds(7)).await.unwrap(),
            LegacyUpgrade::Upgraded
        );
        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert_eq!(user.secured_password, vec![7; 48]);
        assert!(user.kdf_params.is_some());
    }

    #[tokio::test]
    async fn second_legacy_upgrade_is_superseded() {
        let db = Database::open_in_memory().await.unwrap();
        let id = db
            .call(|conn| {
                conn.execute(
                    "INSERT INTO users (login, secured_password) VALUES ('legacy', 'hunter2')",
                    [],
                )?;
                Ok(UserId(conn.last_insert_rowid()))
            })
            .await
            .unwrap();

        let first = reset_and_upgrade(&db, id, b"hunter2".to_vec(), creds(7)).await.unwrap();
        record_failed_attempt(&db, id, 5).await.unwrap();
        let second = reset_and_upgrade(&db, id, b"hunter2".to_vec(), creds(8)).await.unwrap();
        assert_eq!(first, LegacyUpgrade::Upgraded);
        assert_eq!(second, LegacyUpgrade::Superseded);

        let user = get_user(&db, id).await.unwrap().unwrap();
        assert_eq!(user.secured_password, vec![7; 48]);
        assert_eq!(user.kdf_salt.as_deref(), Some(&[7u8; 16][..]));
        // The losing transaction is rolled back, counter reset included.
        assert_eq!(user.failed_attempts, 1);
    }

    #[tokio::test]
    async fn legacy_upgrade_of_locked_account_writes_nothing() {
        let db = Database::open_in_memory().await.unwrap();
        let id = db
            .call(|conn| {
                conn.execute(
                    "INSERT INTO users (login, secured_password, failed_attempts, is_locked)
                     VALUES ('legacy', 'hunter2', 5, 1)",
                    [],
                )?;
                Ok(UserId(conn.last_insert_rowid()))
            })
            .await
            .unwrap();

        assert_eq!(
            reset_and_upgrade(&db, id, b"hunter2".to_vec(), creds(7)).await.unwrap(),
            LegacyUpgrade::Locked
        );
        assert_eq!(get_user(&db, id).await.unwrap().unwrap().secured_password, b"hunter2");
    }

    #[tokio::test]
    async fn replace_credentials_requires_current_value() {
        let (db, id) = setup().await;
        assert!(!replace_credentials(&db, id, vec![9; 48], creds(3)).await.unwrap());
        assert!(replace_credentials(&db, id, vec![1; 48], creds(3)).await.unwrap());
        assert_eq!(
            get_user(&db, id).await.unwrap().unwrap().secured_password,
            vec![3; 48]
        );
    }

    #[tokio::test]
    async fn account_status_reports_lock_state() {
        let (db, id) = setup().await;
        for _ in 0..5 {
            record_failed_attempt(&db, id, 5).await.unwrap();
        }
        let status = account_status(&db, "alice").await.unwrap().unwrap();
        assert_eq!(status.user_id, id);
        assert_eq!(status.state, AccountState::Locked);
        assert_eq!(status.failed_attempts, 5);
    }
}
