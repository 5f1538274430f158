// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by the storage, vault, and CLI layers.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use zeroize::Zeroizing;

/// Consecutive wrong-password attempts that lock an account.
pub const MAX_FAILED_ATTEMPTS: u32 = 5;

/// Row identifier of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub i64);

/// Row identifier of a secret entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Login state of an account.
///
/// `Locked` is terminal: nothing in this workspace transitions back to `Active`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
pub enum AccountState {
    Active,
    Locked,
}

/// A persisted user record.
///
/// `secured_password` is the outer envelope (or a legacy plaintext value for
/// records written before encryption was introduced).
#[derive(Clone)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub secured_password: Vec<u8>,
    pub kdf_salt: Option<Vec<u8>>,
    pub kdf_params: Option<String>,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn state(&self) -> AccountState {
        if self.is_locked {
            AccountState::Locked
        } else {
            AccountState::Active
        }
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("login", &self.login)
            .field("secured_password", &"[REDACTED]")
            .field("failed_attempts", &self.failed_attempts)
            .field("is_locked", &self.is_locked)
            .finish()
    }
}

/// Lock and counter state of an account, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountStatus {
    pub user_id: UserId,
    pub login: String,
    pub state: AccountState,
    pub failed_attempts: u32,
    pub updated_at: String,
}

/// A stored secret entry with its password still sealed.
#[derive(Clone)]
pub struct SecretEntry {
    pub id: EntryId,
    pub owner_user_id: UserId,
    pub service: String,
    pub account_login: String,
    pub account_password: Vec<u8>,
    pub created_at: String,
    pub updated_at: String,
    pub expire_date: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for SecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretEntry")
            .field("id", &self.id)
            .field("owner_user_id", &self.owner_user_id)
            .field("service", &self.service)
            .field("account_login", &self.account_login)
            .field("account_password", &"[REDACTED]")
            .finish()
    }
}

/// Listing view of an entry: metadata only, the password stays encrypted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntrySummary {
    pub id: EntryId,
    pub service: String,
    pub account_login: String,
    pub created_at: String,
    pub updated_at: String,
    pub expire_date: Option<DateTime<Utc>>,
}

impl EntrySummary {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        is_expired_at(self.expire_date, now)
    }
}

/// An entry expires at its expiry instant; one without an expiry date never does.
pub fn is_expired_at(expire_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expire_date.is_some_and(|at| at <= now)
}

/// Fields for a new secret entry.
#[derive(Debug)]
pub struct NewEntry {
    pub service: String,
    pub account_login: String,
    pub account_password: SecretString,
    pub expire_date: Option<DateTime<Utc>>,
}

/// Partial update of a secret entry. `None` leaves the stored value unchanged.
///
/// `expire_date: Some(None)` clears the expiry.
#[derive(Debug, Default)]
pub struct EntryUpdate {
    pub service: Option<String>,
    pub account_login: Option<String>,
    pub account_password: Option<SecretString>,
    pub expire_date: Option<Option<DateTime<Utc>>>,
}

impl EntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.service.is_none()
            && self.account_login.is_none()
            && self.account_password.is_none()
            && self.expire_date.is_none()
    }
}

/// The per-user symmetric key unlocked by a successful login.
///
/// Debug output omits the key bytes.
#[derive(Clone)]
pub struct SessionKey(Zeroizing<[u8; 32]>);

impl SessionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(Zeroizing::new(bytes))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SessionKey([REDACTED])")
    }
}

/// An authenticated session. Every secret-store call is scoped to `user_id`.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub login: String,
    pub key: SessionKey,
}

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    /// Password verified; the failed-attempt counter is back at zero.
    Authenticated(Session),
    /// Unknown login or wrong password.
    InvalidCredentials { remaining_attempts: u32 },
    /// The account was already locked; no attempt was counted.
    Locked,
    /// This attempt reached the threshold and locked the account.
    LockedNow,
}

impl LoginOutcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Result of a registration attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    Registered(UserId),
    DuplicateLogin,
}
