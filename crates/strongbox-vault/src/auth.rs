// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registration and the login state machine.
//!
//! Key hierarchy per user:
//! - a random data key (DEK) encrypts that user's secret entries;
//! - Argon2id(master password, salt) wraps the DEK;
//! - the root key wraps the result, binding the record to this installation.
//!
//! `users.secured_password` holds `seal(root, seal(derived, DEK))`. Changing
//! the master password only re-wraps the DEK; entries are never re-encrypted.
//!
//! Accounts move `Active(0..=4)` -> `Locked` on the fifth consecutive wrong
//! password. Every counter change is a single conditional UPDATE committed
//! before the call returns.

use std::sync::Arc;

use ring::digest::{SHA256, digest};
use secrecy::{ExposeSecret, SecretString};
use strongbox_config::model::KdfConfig;
use strongbox_core::{
    AccountStatus, LoginOutcome, MAX_FAILED_ATTEMPTS, RegisterOutcome, Session, SessionKey,
    StrongboxError, User,
};
use strongbox_storage::Database;
use strongbox_storage::models::{CredentialUpdate, FailedAttempt, LegacyUpgrade};
use strongbox_storage::queries::users;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{self, Opened};
use crate::kdf::{self, KdfParams};
use crate::keystore::KeyStore;

/// Trim a login and reject empty ones.
pub fn normalize_login(login: &str) -> Result<String, StrongboxError> {
    let trimmed = login.trim();
    if trimmed.is_empty() {
        return Err(StrongboxError::InvalidInput("login must not be empty".into()));
    }
    Ok(trimmed.to_string())
}

enum Verification {
    Verified {
        data_key: Zeroizing<[u8; 32]>,
        upgrade: Option<CredentialUpdate>,
    },
    Mismatch,
}

/// Registers users and runs the login state machine.
pub struct AuthService {
    db: Database,
    keystore: Arc<KeyStore>,
    kdf: KdfParams,
}

impl AuthService {
    pub fn new(db: Database, keystore: Arc<KeyStore>, kdf: &KdfConfig) -> Self {
        Self {
            db,
            keystore,
            kdf: KdfParams::from(kdf),
        }
    }

    /// Register `login` with `master_password`.
    ///
    /// Logins are trimmed and unique without regard to ASCII case.
    pub async fn register(
        &self,
        login: &str,
        master_password: &SecretString,
    ) -> Result<RegisterOutcome, StrongboxError> {
        let login = normalize_login(login)?;
        if master_password.expose_secret().is_empty() {
            return Err(StrongboxError::InvalidInput(
                "master password must not be empty".into(),
            ));
        }

        let data_key = Zeroizing::new(crypto::generate_random_key()?);
        let credentials = self.wrap_data_key(&data_key, master_password).await?;

        match users::register_user(&self.db, &login, credentials).await? {
            Some(id) => {
                info!(user_id = %id, "user registered");
                Ok(RegisterOutcome::Registered(id))
            }
            None => {
                debug!("registration rejected: login taken");
                Ok(RegisterOutcome::DuplicateLogin)
            }
        }
    }

    /// Attempt a login. Wrong passwords and lockouts are outcomes, not errors.
    ///
    /// An unknown login costs one key derivation and answers exactly like a
    /// first wrong password on a fresh account.
    pub async fn login(
        &self,
        login: &str,
        master_password: &SecretString,
    ) -> Result<LoginOutcome, StrongboxError> {
        // A superseded legacy upgrade leaves an envelope behind, so the
        // second pass always takes the envelope path.
        for _ in 0..2 {
            if let Some(outcome) = self.attempt_login(login, master_password).await? {
                return Ok(outcome);
            }
            debug!("legacy credential upgraded by a concurrent login, re-reading");
        }
        Err(StrongboxError::Internal(
            "credential kept changing during login".into(),
        ))
    }

    /// One pass of the login state machine.
    ///
    /// Returns `None` when a concurrent login upgraded the same legacy
    /// credential first; the row must then be read again.
    async fn attempt_login(
        &self,
        login: &str,
        master_password: &SecretString,
    ) -> Result<Option<LoginOutcome>, StrongboxError> {
        let user = match normalize_login(login) {
            Ok(login) => users::find_by_login(&self.db, &login).await?,
            Err(_) => None,
        };
        let Some(user) = user else {
            self.burn_derivation(master_password).await?;
            debug!("login attempt for unknown account");
            return Ok(Some(LoginOutcome::InvalidCredentials {
                remaining_attempts: MAX_FAILED_ATTEMPTS - 1,
            }));
        };

        if user.is_locked {
            warn!(user_id = %user.id, "login attempt on locked account");
            return Ok(Some(LoginOutcome::Locked));
        }

        let outcome = match self.verify(&user, master_password).await? {
            Verification::Verified { data_key, upgrade } => {
                let legacy = upgrade.is_some();
                let still_active = match upgrade {
                    Some(credentials) => {
                        let upgraded = users::reset_and_upgrade(
                            &self.db,
                            user.id,
                            user.secured_password.clone(),
                            credentials,
                        )
                        .await?;
                        match upgraded {
                            LegacyUpgrade::Upgraded => true,
                            LegacyUpgrade::Locked => false,
                            LegacyUpgrade::Superseded => return Ok(None),
                        }
                    }
                    None => users::reset_failed_attempts(&self.db, user.id).await?,
                };
                if !still_active {
                    warn!(user_id = %user.id, "account locked during login");
                    return Ok(Some(LoginOutcome::Locked));
                }
                if legacy {
                    info!(user_id = %user.id, "legacy plaintext credential upgraded");
                }
                debug!(user_id = %user.id, "login succeeded");
                LoginOutcome::Authenticated(Session {
                    user_id: user.id,
                    login: user.login,
                    key: SessionKey::new(*data_key),
                })
            }
            Verification::Mismatch => {
                match users::record_failed_attempt(&self.db, user.id, MAX_FAILED_ATTEMPTS).await? {
                    FailedAttempt::Counted { failed_attempts } => {
                        warn!(user_id = %user.id, failed_attempts, "wrong master password");
                        LoginOutcome::InvalidCredentials {
                            remaining_attempts: MAX_FAILED_ATTEMPTS.saturating_sub(failed_attempts),
                        }
                    }
                    FailedAttempt::LockedNow { failed_attempts } => {
                        warn!(user_id = %user.id, failed_attempts, "account locked");
                        LoginOutcome::LockedNow
                    }
                    FailedAttempt::AlreadyLocked => LoginOutcome::Locked,
                }
            }
        };
        Ok(Some(outcome))
    }

    /// Re-wrap the session's data key under `new_password`.
    ///
    /// Returns `false` if the account was locked or its credential changed
    /// since the session was opened.
    pub async fn change_master_password(
        &self,
        session: &Session,
        new_password: &SecretString,
    ) -> Result<bool, StrongboxError> {
        if new_password.expose_secret().is_empty() {
            return Err(StrongboxError::InvalidInput(
                "master password must not be empty".into(),
            ));
        }
        let Some(user) = users::get_user(&self.db, session.user_id).await? else {
            return Err(StrongboxError::OwnerNotFound(session.user_id.0));
        };

        let data_key = Zeroizing::new(*session.key.as_bytes());
        let credentials = self.wrap_data_key(&data_key, new_password).await?;
        let changed =
            users::replace_credentials(&self.db, user.id, user.secured_password, credentials)
                .await?;
        if changed {
            info!(user_id = %user.id, "master password changed");
        }
        Ok(changed)
    }

    /// Lock state and failed-attempt count for `login`.
    pub async fn account_status(&self, login: &str) -> Result<Option<AccountStatus>, StrongboxError> {
        let login = normalize_login(login)?;
        users::account_status(&self.db, &login).await
    }

    async fn verify(
        &self,
        user: &User,
        master_password: &SecretString,
    ) -> Result<Verification, StrongboxError> {
        let root = self.keystore.root_key().as_bytes();
        match crypto::open_legacy_aware(&user.secured_password, root)? {
            Opened::Decrypted(wrapped) => {
                let (Some(salt), Some(params)) = (&user.kdf_salt, &user.kdf_params) else {
                    return Err(StrongboxError::AuthenticationFailed);
                };
                let params = KdfParams::from_json(params)?;
                let derived = derive(master_password, salt.clone(), params).await?;
                match crypto::decrypt(&wrapped, &derived) {
                    Ok(bytes) => {
                        let bytes = Zeroizing::new(bytes);
                        let data_key: [u8; 32] = bytes
                            .as_slice()
                            .try_into()
                            .map_err(|_| StrongboxError::AuthenticationFailed)?;
                        Ok(Verification::Verified {
                            data_key: Zeroizing::new(data_key),
                            upgrade: None,
                        })
                    }
                    Err(StrongboxError::AuthenticationFailed) => Ok(Verification::Mismatch),
                    Err(e) => Err(e),
                }
            }
            Opened::LegacyPlaintext(stored) => {
                let stored = Zeroizing::new(stored);
                warn!(user_id = %user.id, "legacy plaintext credential encountered");
                let supplied = digest(&SHA256, master_password.expose_secret().as_bytes());
                let expected = digest(&SHA256, &stored);
                if supplied.as_ref() != expected.as_ref() {
                    return Ok(Verification::Mismatch);
                }
                let data_key = Zeroizing::new(crypto::generate_random_key()?);
                let upgrade = self.wrap_data_key(&data_key, master_password).await?;
                Ok(Verification::Verified {
                    data_key,
                    upgrade: Some(upgrade),
                })
            }
        }
    }

    /// Produce `seal(root, seal(derived, data_key))` with a fresh salt.
    async fn wrap_data_key(
        &self,
        data_key: &[u8; 32],
        master_password: &SecretString,
    ) -> Result<CredentialUpdate, StrongboxError> {
        let salt = kdf::generate_salt()?;
        let derived = derive(master_password, salt.to_vec(), self.kdf).await?;
        let inner = crypto::encrypt(data_key, &derived)?;
        let outer = crypto::encrypt(inner.as_bytes(), self.keystore.root_key().as_bytes())?;
        Ok(CredentialUpdate {
            secured_password: outer.into_bytes(),
            kdf_salt: salt.to_vec(),
            kdf_params: self.kdf.to_json()?,
        })
    }

    async fn burn_derivation(&self, master_password: &SecretString) -> Result<(), StrongboxError> {
        let salt = kdf::generate_salt()?;
        derive(master_password, salt.to_vec(), self.kdf).await?;
        Ok(())
    }
}

/// Run Argon2id off the async executor.
async fn derive(
    master_password: &SecretString,
    salt: Vec<u8>,
    params: KdfParams,
) -> Result<Zeroizing<[u8; 32]>, StrongboxError> {
    let password = Zeroizing::new(master_password.expose_secret().as_bytes().to_vec());
    tokio::task::spawn_blocking(move || kdf::derive_key(&password, &salt, &params))
        .await
        .map_err(|e| StrongboxError::Internal(format!("key derivation task failed: {e}")))?
}
