// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Argon2id key derivation from a master password.
//!
//! Derives a 32-byte key using Argon2id (Algorithm::Argon2id, Version::V0x13).
//! The parameters used are stored next to each user's salt as JSON, so raising
//! the configured cost only affects newly written records.

use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use strongbox_config::model::KdfConfig;
use strongbox_core::StrongboxError;
use zeroize::Zeroizing;

/// Length of the per-user random salt.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters, as persisted in `users.kdf_params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    pub memory_cost: u32,
    pub iterations: u32,
    pub parallelism: u32,
}

impl From<&KdfConfig> for KdfParams {
    fn from(config: &KdfConfig) -> Self {
        Self {
            memory_cost: config.memory_cost,
            iterations: config.iterations,
            parallelism: config.parallelism,
        }
    }
}

impl KdfParams {
    pub fn to_json(&self) -> Result<String, StrongboxError> {
        serde_json::to_string(self)
            .map_err(|e| StrongboxError::Internal(format!("cannot encode KDF parameters: {e}")))
    }

    /// Parse parameters recorded with a user. Unreadable parameters make the
    /// stored credential unverifiable.
    pub fn from_json(json: &str) -> Result<Self, StrongboxError> {
        serde_json::from_str(json).map_err(|_| StrongboxError::AuthenticationFailed)
    }
}

/// Derive a 32-byte key from `passphrase` using Argon2id.
///
/// The returned key is wrapped in [`Zeroizing`] for automatic memory zeroing
/// on drop.
pub fn derive_key(
    passphrase: &[u8],
    salt: &[u8],
    params: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, StrongboxError> {
    let argon_params = argon2::Params::new(
        params.memory_cost,
        params.iterations,
        params.parallelism,
        Some(32),
    )
    .map_err(|e| StrongboxError::Crypto(format!("invalid Argon2id parameters: {e}")))?;

    let argon2 = argon2::Argon2::new(
        argon2::Algorithm::Argon2id,
        argon2::Version::V0x13,
        argon_params,
    );

    let mut output = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase, salt, output.as_mut())
        .map_err(|e| StrongboxError::Crypto(format!("Argon2id key derivation failed: {e}")))?;

    Ok(output)
}

/// Generate a random salt for Argon2id.
pub fn generate_salt() -> Result<[u8; SALT_LEN], StrongboxError> {
    let mut salt = [0u8; SALT_LEN];
    SystemRandom::new()
        .fill(&mut salt)
        .map_err(|_| StrongboxError::Crypto("failed to generate random salt".to_string()))?;
    Ok(salt)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAST: KdfParams = KdfParams {
        memory_cost: 8192,
        iterations: 1,
        parallelism: 1,
    };

    #[test]
    fn derive_key_is_deterministic() {
        let key1 = derive_key(b"test passphrase", &[1u8; 16], &FAST).unwrap();
        let key2 = derive_key(b"test passphrase", &[1u8; 16], &FAST).unwrap();
        assert_eq!(*key1, *key2);
    }

    #[test]
    fn different_passphrase_produces_different_key() {
        let key1 = derive_key(b"passphrase one", &[2u8; 16], &FAST).unwrap();
        let key2 = derive_key(b"passphrase two", &[2u8; 16], &FAST).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn different_salt_produces_different_key() {
        let key1 = derive_key(b"same passphrase", &[1u8; 16], &FAST).unwrap();
        let key2 = derive_key(b"same passphrase", &[2u8; 16], &FAST).unwrap();
        assert_ne!(*key1, *key2);
    }

    #[test]
    fn generate_salt_produces_random_values() {
        assert_ne!(generate_salt().unwrap(), generate_salt().unwrap());
    }

    #[test]
    fn invalid_params_are_crypto_errors() {
        let bad = KdfParams {
            memory_cost: 1,
            iterations: 0,
            parallelism: 0,
        };
        assert!(matches!(
            derive_key(b"x", &[0u8; 16], &bad),
            Err(StrongboxError::Crypto(_))
        ));
    }

    #[test]
    fn params_json_matches_stored_shape() {
        let json = FAST.to_json().unwrap();
        assert_eq!(json, r#"{"memory_cost":8192,"iterations":1,"parallelism":1}"#);
        assert_eq!(KdfParams::from_json(&json).unwrap(), FAST);
        assert!(matches!(
            KdfParams::from_json("not json"),
            Err(StrongboxError::AuthenticationFailed)
        ));
    }

    #[test]
    fn params_follow_config() {
        let params = KdfParams::from(&KdfConfig::default());
        assert_eq!(params.memory_cost, 65536);
        assert_eq!(params.iterations, 3);
        assert_eq!(params.parallelism, 4);
    }
}
