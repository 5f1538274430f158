// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain model types for storage entities.
//!
//! The canonical types are defined in `strongbox-core::types` so the vault and
//! CLI crates share them. This module re-exports them alongside the
//! storage-only result types.

pub use strongbox_core::types::{AccountStatus, EntryId, EntrySummary, SecretEntry, User, UserId};

/// Result of counting one failed login against a user row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailedAttempt {
    /// The counter was incremented and the account is still active.
    Counted { failed_attempts: u32 },
    /// This increment reached the threshold and locked the account.
    LockedNow { failed_attempts: u32 },
    /// The account was already locked; nothing was written.
    AlreadyLocked,
}

/// Result of replacing a legacy plaintext credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyUpgrade {
    /// The new credential was written and the counter reset.
    Upgraded,
    /// The row no longer holds the legacy value; nothing was written.
    Superseded,
    /// The account was locked; nothing was written.
    Locked,
}

/// Replacement credential material for a user row.
///
/// Used both to upgrade a legacy plaintext record and to re-key after a
/// master password change.
#[derive(Clone)]
pub struct CredentialUpdate {
    pub secured_password: Vec<u8>,
    pub kdf_salt: Vec<u8>,
    pub kdf_params: String,
}

impl std::fmt::Debug for CredentialUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialUpdate")
            .field("secured_password", &"[REDACTED]")
            .field("kdf_params", &self.kdf_params)
            .finish()
    }
}

/// Column values for a new entry, password already sealed.
#[derive(Clone)]
pub struct EntryRecord {
    pub service: String,
    pub account_login: String,
    pub account_password: Vec<u8>,
    pub expire_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Column changes for an existing entry. `None` keeps the stored value.
#[derive(Clone, Default)]
pub struct EntryChanges {
    pub service: Option<String>,
    pub account_login: Option<String>,
    pub account_password: Option<Vec<u8>>,
    pub expire_date: Option<Option<chrono::DateTime<chrono::Utc>>>,
}

impl EntryChanges {
    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.account_login.is_none()
            && self.account_password.is_none()
            && self.expire_date.is_none()
    }
}
