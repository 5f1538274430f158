// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Authentication and credential encryption for the Strongbox vault.
//!
//! - [`KeyStore`] loads or creates the installation's root key once.
//! - [`crypto`] seals and opens AES-256-GCM envelopes.
//! - [`AuthService`] registers users and runs the login lockout state machine,
//!   producing a [`strongbox_core::Session`] that carries the user's data key.
//! - [`SecretStore`] performs session-scoped CRUD over encrypted entries.

pub mod auth;
pub mod crypto;
pub mod kdf;
pub mod keystore;
pub mod migration;
pub mod prompt;
pub mod secrets;

pub use auth::AuthService;
pub use crypto::{Envelope, Opened};
pub use keystore::{KeyStore, RootKey};
pub use migration::MigrationReport;
pub use prompt::{get_master_password, get_new_master_password};
pub use secrets::{RevealedSecret, SecretStore, mask_secret};
