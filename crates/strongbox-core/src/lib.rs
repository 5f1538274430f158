// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strongbox credential vault.
//!
//! Provides the error taxonomy, the domain types passed between the storage,
//! vault, and CLI crates, and the storage lifecycle trait.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::StrongboxError;
pub use traits::{HealthStatus, StorageAdapter};
pub use types::{
    AccountState, AccountStatus, EntryId, EntrySummary, EntryUpdate, LoginOutcome,
    MAX_FAILED_ATTEMPTS, NewEntry, RegisterOutcome, SecretEntry, Session, SessionKey, User,
    UserId, is_expired_at,
};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use secrecy::SecretString;

    #[test]
    fn storage_unavailable_is_detected() {
        let err = StrongboxError::unavailable("timed out");
        assert!(err.is_storage_unavailable());
        assert!(!StrongboxError::AuthenticationFailed.is_storage_unavailable());
        assert!(err.to_string().contains("timed out"));
    }

    #[test]
    fn every_error_variant_renders_its_kind() {
        let all = [
            StrongboxError::OwnerNotFound(3),
            StrongboxError::AuthenticationFailed,
            StrongboxError::KeyUnavailable("missing".into()),
            StrongboxError::KeyCorrupt("bad base64".into()),
            StrongboxError::unavailable("busy"),
            StrongboxError::Storage {
                source: "no such table".into(),
            },
            StrongboxError::Crypto("rng".into()),
            StrongboxError::InvalidInput("empty".into()),
            StrongboxError::Internal("bug".into()),
        ];
        for err in &all {
            // Exhaustive, so a new variant must be listed here.
            let kind = match err {
                StrongboxError::OwnerNotFound(_) => "owner",
                StrongboxError::AuthenticationFailed => "authentication",
                StrongboxError::KeyUnavailable(_) | StrongboxError::KeyCorrupt(_) => "root key",
                StrongboxError::StorageUnavailable { .. } => "unavailable",
                StrongboxError::Storage { .. } => "storage",
                StrongboxError::Crypto(_) => "crypto",
                StrongboxError::InvalidInput(_) => "invalid",
                StrongboxError::Internal(_) => "internal",
            };
            assert!(err.to_string().contains(kind), "{err}");
        }
    }

    #[test]
    fn account_state_round_trips_through_strings() {
        use std::str::FromStr;

        for state in [AccountState::Active, AccountState::Locked] {
            let parsed = AccountState::from_str(&state.to_string()).expect("should parse back");
            assert_eq!(state, parsed);
        }
        assert_eq!(AccountState::Locked.to_string(), "locked");
    }

    #[test]
    fn session_debug_redacts_key() {
        let session = Session {
            user_id: UserId(7),
            login: "alice".into(),
            key: SessionKey::new([0xAB; 32]),
        };
        let rendered = format!("{session:?}");
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains("171"));
    }

    #[test]
    fn user_debug_redacts_secured_password() {
        let user = User {
            id: UserId(1),
            login: "alice".into(),
            secured_password: b"plaintext-legacy".to_vec(),
            kdf_salt: None,
            kdf_params: None,
            failed_attempts: 0,
            is_locked: false,
            created_at: String::new(),
            updated_at: String::new(),
        };
        assert!(!format!("{user:?}").contains("plaintext-legacy"));
        assert_eq!(user.state(), AccountState::Active);
    }

    #[test]
    fn entry_expiry() {
        let now = Utc::now();
        let mut summary = EntrySummary {
            id: EntryId(1),
            service: "github".into(),
            account_login: "alice".into(),
            created_at: String::new(),
            updated_at: String::new(),
            expire_date: None,
        };
        assert!(!summary.is_expired(now));

        summary.expire_date = Some(now - Duration::days(1));
        assert!(summary.is_expired(now));

        summary.expire_date = Some(now + Duration::days(1));
        assert!(!summary.is_expired(now));

        // Expiry is inclusive of the instant itself.
        assert!(is_expired_at(Some(now), now));
        assert!(!is_expired_at(None, now));
    }

    #[test]
    fn entry_update_emptiness() {
        assert!(EntryUpdate::default().is_empty());
        let update = EntryUpdate {
            account_password: Some(SecretString::from("x".to_string())),
            ..Default::default()
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn ids_serialize_as_integers() {
        let json = serde_json::to_string(&EntryId(42)).expect("should serialize");
        assert_eq!(json, "42");
        assert_eq!(UserId(3).to_string(), "3");
    }

    #[test]
    fn lockout_threshold_is_five() {
        assert_eq!(MAX_FAILED_ATTEMPTS, 5);
    }
}
