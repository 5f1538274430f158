// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strongbox credential vault.
//!
//! Expected business outcomes (wrong password, lockout, duplicate login) are
//! not errors; they are returned as [`crate::LoginOutcome`] and
//! [`crate::RegisterOutcome`] variants. This enum covers the conditions a
//! caller cannot recover from by re-prompting.

use thiserror::Error;

/// The primary error type used across all Strongbox crates.
#[derive(Debug, Error)]
pub enum StrongboxError {
    /// A per-user operation referenced a user row that does not exist.
    #[error("owner user {0} does not exist")]
    OwnerNotFound(i64),

    /// An envelope did not verify: wrong key, tampered data, or malformed blob.
    #[error("authentication failed -- wrong key or tampered data")]
    AuthenticationFailed,

    /// The root key file could not be read or written.
    #[error("root key unavailable: {0}")]
    KeyUnavailable(String),

    /// The root key file exists but its contents are not a valid key.
    #[error("root key corrupt: {0}")]
    KeyCorrupt(String),

    /// The store could not be reached in time (closed, busy, locked, or timed out).
    #[error("storage unavailable: {message}")]
    StorageUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A statement failed for a reason other than connectivity.
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Randomness or key-derivation failure.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// Caller-supplied arguments were rejected before touching storage.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrongboxError {
    /// Build a [`StrongboxError::StorageUnavailable`] without an underlying source.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::StorageUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// True for transient connectivity failures a caller may choose to retry.
    pub fn is_storage_unavailable(&self) -> bool {
        matches!(self, Self::StorageUnavailable { .. })
    }
}
