// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session-scoped CRUD over a user's service credentials.
//!
//! Every call takes the authenticated [`Session`]; the owner id and the key
//! both come from it, so one user's session can never address another
//! user's rows. Passwords are sealed with the session key before they reach
//! storage and are only opened by [`SecretStore::reveal`].

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use strongbox_core::{
    EntryId, EntrySummary, EntryUpdate, NewEntry, Session, StrongboxError,
};
use strongbox_storage::Database;
use strongbox_storage::models::{EntryChanges, EntryRecord};
use strongbox_storage::queries::entries;
use tracing::{debug, warn};

use crate::crypto;
use crate::migration::{self, MigrationReport};

/// A decrypted entry returned by [`SecretStore::reveal`].
#[derive(Debug)]
pub struct RevealedSecret {
    pub id: EntryId,
    pub service: String,
    pub account_login: String,
    pub account_password: SecretString,
    pub expire_date: Option<DateTime<Utc>>,
    /// The stored password was legacy plaintext, not an envelope.
    pub legacy: bool,
}

fn required(field: &str, value: String) -> Result<String, StrongboxError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StrongboxError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(trimmed.to_string())
}

fn seal_password(session: &Session, password: &SecretString) -> Result<Vec<u8>, StrongboxError> {
    Ok(crypto::encrypt(password.expose_secret().as_bytes(), session.key.as_bytes())?.into_bytes())
}

/// Encrypted secret entries for authenticated sessions.
#[derive(Clone)]
pub struct SecretStore {
    db: Database,
}

impl SecretStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Store a new entry, sealing its password under the session key.
    pub async fn add(&self, session: &Session, entry: NewEntry) -> Result<EntryId, StrongboxError> {
        let record = EntryRecord {
            service: required("service", entry.service)?,
            account_login: required("account login", entry.account_login)?,
            account_password: seal_password(session, &entry.account_password)?,
            expire_date: entry.expire_date,
        };
        let id = entries::insert_entry(&self.db, session.user_id, record).await?;
        debug!(user_id = %session.user_id, entry_id = %id, "entry added");
        Ok(id)
    }

    /// The session user's entries, newest first. Passwords stay sealed.
    pub async fn list(&self, session: &Session) -> Result<Vec<EntrySummary>, StrongboxError> {
        entries::list_entries(&self.db, session.user_id).await
    }

    /// Apply a partial update. Returns `false` when the session user has no
    /// such entry.
    pub async fn update(
        &self,
        session: &Session,
        id: EntryId,
        update: EntryUpdate,
    ) -> Result<bool, StrongboxError> {
        let changes = EntryChanges {
            service: update.service.map(|s| required("service", s)).transpose()?,
            account_login: update
                .account_login
                .map(|s| required("account login", s))
                .transpose()?,
            account_password: update
                .account_password
                .as_ref()
                .map(|p| seal_password(session, p))
                .transpose()?,
            expire_date: update.expire_date,
        };
        let found = entries::update_entry(&self.db, session.user_id, id, changes).await?;
        debug!(user_id = %session.user_id, entry_id = %id, found, "entry update");
        Ok(found)
    }

    /// Delete an entry. Returns `false` when the session user has no such entry.
    pub async fn delete(&self, session: &Session, id: EntryId) -> Result<bool, StrongboxError> {
        let found = entries::delete_entry(&self.db, session.user_id, id).await?;
        debug!(user_id = %session.user_id, entry_id = %id, found, "entry delete");
        Ok(found)
    }

    /// Decrypt one entry on demand.
    ///
    /// Legacy plaintext rows are returned with `legacy = true`; a sealed
    /// password that fails to verify is [`StrongboxError::AuthenticationFailed`].
    pub async fn reveal(
        &self,
        session: &Session,
        id: EntryId,
    ) -> Result<Option<RevealedSecret>, StrongboxError> {
        let Some(entry) = entries::get_entry(&self.db, session.user_id, id).await? else {
            return Ok(None);
        };
        let opened = crypto::open_legacy_aware(&entry.account_password, session.key.as_bytes())?;
        let legacy = opened.is_legacy();
        if legacy {
            warn!(user_id = %session.user_id, entry_id = %id, "entry holds legacy plaintext");
        }
        let password = String::from_utf8(opened.into_bytes()).map_err(|_| {
            StrongboxError::Internal(format!("entry {id} password is not valid UTF-8"))
        })?;
        Ok(Some(RevealedSecret {
            id: entry.id,
            service: entry.service,
            account_login: entry.account_login,
            account_password: SecretString::from(password),
            expire_date: entry.expire_date,
            legacy,
        }))
    }

    /// Re-encrypt every legacy plaintext password the session user owns.
    pub async fn migrate_legacy_entries(
        &self,
        session: &Session,
    ) -> Result<MigrationReport, StrongboxError> {
        migration::migrate_legacy_entries(&self.db, session).await
    }
}

/// Mask a secret for display, keeping at most four characters at each end.
///
/// Values shorter than 10 characters are fully masked.
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
