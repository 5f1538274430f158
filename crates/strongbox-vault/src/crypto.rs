// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM envelopes.
//!
//! An envelope is `b"SBX1" || nonce(12) || ciphertext || tag(16)`. Every call to
//! [`encrypt`] draws a fresh random 96-bit nonce from the system CSPRNG; nonce
//! reuse under one key would be catastrophic for GCM.
//!
//! [`decrypt`] is strict: anything that does not verify is
//! [`StrongboxError::AuthenticationFailed`]. [`open_legacy_aware`] is the only
//! path that accepts pre-encryption plaintext, and only for blobs that are not
//! shaped like an envelope at all.

use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use strongbox_core::StrongboxError;

/// Leading bytes of every envelope.
pub const ENVELOPE_MAGIC: &[u8; 4] = b"SBX1";

const TAG_LEN: usize = 16;

/// Smallest possible envelope: magic, nonce, and tag around an empty payload.
pub const ENVELOPE_OVERHEAD: usize = ENVELOPE_MAGIC.len() + NONCE_LEN + TAG_LEN;

/// A sealed, self-contained ciphertext ready to be stored as a BLOB.
#[derive(Clone, PartialEq, Eq)]
pub struct Envelope(Vec<u8>);

impl Envelope {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    /// True when `bytes` has the magic prefix and room for a nonce and tag.
    pub fn is_well_formed(bytes: &[u8]) -> bool {
        bytes.len() >= ENVELOPE_OVERHEAD && bytes.starts_with(ENVELOPE_MAGIC)
    }
}

impl std::fmt::Debug for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Envelope({} bytes)", self.0.len())
    }
}

/// Result of reading a blob that may predate encryption.
#[derive(Debug, PartialEq, Eq)]
pub enum Opened {
    /// The blob was an envelope and verified under the key.
    Decrypted(Vec<u8>),
    /// The blob was not an envelope; returned unchanged.
    LegacyPlaintext(Vec<u8>),
}

impl Opened {
    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::LegacyPlaintext(_))
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Decrypted(bytes) | Self::LegacyPlaintext(bytes) => bytes,
        }
    }
}

fn aead_key(key: &[u8; 32]) -> Result<LessSafeKey, StrongboxError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| StrongboxError::Crypto("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `key` into a fresh envelope.
pub fn encrypt(plaintext: &[u8], key: &[u8; 32]) -> Result<Envelope, StrongboxError> {
    let sealing_key = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| StrongboxError::Crypto("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    sealing_key
        .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce_bytes), Aad::empty(), &mut in_out)
        .map_err(|_| StrongboxError::Crypto("AES-256-GCM encryption failed".to_string()))?;

    let mut envelope = Vec::with_capacity(ENVELOPE_MAGIC.len() + NONCE_LEN + in_out.len());
    envelope.extend_from_slice(ENVELOPE_MAGIC);
    envelope.extend_from_slice(&nonce_bytes);
    envelope.extend_from_slice(&in_out);
    Ok(Envelope(envelope))
}

/// Decrypt an envelope. Malformed input, a wrong key, and tampering all fail
/// with [`StrongboxError::AuthenticationFailed`].
pub fn decrypt(envelope: &[u8], key: &[u8; 32]) -> Result<Vec<u8>, StrongboxError> {
    if !Envelope::is_well_formed(envelope) {
        return Err(StrongboxError::AuthenticationFailed);
    }
    let body = &envelope[ENVELOPE_MAGIC.len()..];
    let (nonce_bytes, sealed) = body.split_at(NONCE_LEN);
    let nonce = Nonce::try_assume_unique_for_key(nonce_bytes)
        .map_err(|_| StrongboxError::AuthenticationFailed)?;

    let opening_key = aead_key(key)?;
    let mut in_out = sealed.to_vec();
    let plaintext = opening_key
        .open_in_place(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| StrongboxError::AuthenticationFailed)?;
    Ok(plaintext.to_vec())
}

/// Decrypt `stored`, or hand it back untouched if it is not an envelope.
///
/// A well-formed envelope that fails to verify is still an error.
pub fn open_legacy_aware(stored: &[u8], key: &[u8; 32]) -> Result<Opened, StrongboxError> {
    if Envelope::is_well_formed(stored) {
        decrypt(stored, key).map(Opened::Decrypted)
    } else {
        Ok(Opened::LegacyPlaintext(stored.to_vec()))
    }
}

/// Generate a random 32-byte key suitable for AES-256-GCM.
pub fn generate_random_key() -> Result<[u8; 32], StrongboxError> {
    let mut key = [0u8; 32];
    SystemRandom::new()
        .fill(&mut key)
        .map_err(|_| StrongboxError::Crypto("failed to generate random key".to_string()))?;
    Ok(key)
}
