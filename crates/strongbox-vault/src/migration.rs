// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Re-encryption of entries written before passwords were sealed.
//!
//! Legacy rows hold the account password as plain text. A migration pass
//! seals each one under the session key. Rows that are already envelopes are
//! left alone, so the pass is idempotent.

use strongbox_core::{EntryId, Session, StrongboxError};
use strongbox_storage::Database;
use strongbox_storage::queries::entries;
use tracing::{info, warn};

use crate::crypto::{self, Envelope};

/// Report of what a migration pass did.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Entries whose plaintext password was sealed by this pass.
    pub migrated: Vec<EntryId>,
    /// Entries that were already envelopes.
    pub already_encrypted: usize,
    /// Entries changed by someone else while this pass ran.
    pub skipped: Vec<EntryId>,
}

/// Seal every legacy plaintext password owned by the session user.
pub async fn migrate_legacy_entries(
    db: &Database,
    session: &Session,
) -> Result<MigrationReport, StrongboxError> {
    let mut report = MigrationReport::default();

    for (id, stored) in entries::list_entry_passwords(db, session.user_id).await? {
        if Envelope::is_well_formed(&stored) {
            report.already_encrypted += 1;
            continue;
        }
        let sealed = crypto::encrypt(&stored, session.key.as_bytes())?.into_bytes();
        if entries::replace_entry_password(db, session.user_id, id, stored, sealed).await? {
            report.migrated.push(id);
        } else {
            warn!(user_id = %session.user_id, entry_id = %id, "entry changed during migration, skipped");
            report.skipped.push(id);
        }
    }

    if report.migrated.is_empty() {
        info!(user_id = %session.user_id, "no legacy entries to migrate");
    } else {
        info!(
            user_id = %session.user_id,
            migrated = report.migrated.len(),
            "legacy entries sealed"
        );
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::SecretStore;
    use rusqlite::params;
    use secrecy::{ExposeSecret, SecretString};
    use strongbox_core::{NewEntry, SessionKey};
    use strongbox_storage::models::CredentialUpdate;
    use strongbox_storage::queries::users;

    async fn setup() -> (Database, Session) {
        let db = Database::open_in_memory().await.unwrap();
        let id = users::register_user(
            &db,
            "legacy-user",
            CredentialUpdate {
                secured_password: vec![0; 48],
                kdf_salt: vec![0; 16],
                kdf_params: "{}".into(),
            },
        )
        .await
        .unwrap()
        .unwrap();
        let session = Session {
            user_id: id,
            login: "legacy-user".into(),
            key: SessionKey::new(crypto::generate_random_key().unwrap()),
        };
        (db, session)
    }

    async fn insert_plaintext(db: &Database, session: &Session, service: &str, password: &str) -> EntryId {
        let owner = session.user_id.0;
        let service = service.to_string();
        let password = password.to_string();
        db.call(move |conn| {
            conn.execute(
                "INSERT INTO secret_entries (owner_user_id, service, account_login, account_password)
                 VALUES (?1, ?2, 'me', ?3)",
                params![owner, service, password],
            )?;
            Ok(EntryId(conn.last_insert_rowid()))
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn legacy_entries_are_sealed_once() {
        let (db, session) = setup().await;
        let store = SecretStore::new(db.clone());
        let legacy = insert_plaintext(&db, &session, "forum", "plain-pw").await;
        store
            .add(
                &session,
                NewEntry {
                    service: "bank".into(),
                    account_login: "me".into(),
                    account_password: SecretString::from("sealed-pw".to_string()),
                    expire_date: None,
                },
            )
            .await
            .unwrap();

        let before = store.reveal(&session, legacy).await.unwrap().unwrap();
        assert!(before.legacy);
        assert_eq!(before.account_password.expose_secret(), "plain-pw");

        let report = migrate_legacy_entries(&db, &session).await.unwrap();
        assert_eq!(report.migrated, vec![legacy]);
        assert_eq!(report.already_encrypted, 1);
        assert!(report.skipped.is_empty());

        let after = store.reveal(&session, legacy).await.unwrap().unwrap();
        assert!(!after.legacy);
        assert_eq!(after.account_password.expose_secret(), "plain-pw");

        let again = migrate_legacy_entries(&db, &session).await.unwrap();
        assert!(again.migrated.is_empty());
        assert_eq!(again.already_encrypted, 2);
    }

    #[tokio::test]
    async fn empty_store_reports_nothing() {
        let (db, session) = setup().await;
        assert_eq!(
            migrate_legacy_entries(&db, &session).await.unwrap(),
            MigrationReport::default()
        );
    }
}
