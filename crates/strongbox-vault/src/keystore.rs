// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Root key file management.
//!
//! The root key is a random 256-bit AES key kept in a small JSON file:
//!
//! ```json
//! {"kty":"oct","kid":"root-key-1","alg":"A256GCM","created_at":"...","k_b64":"..."}
//! ```
//!
//! Creation is create-if-absent: the key is written to a temp file in the
//! target directory and linked into place with `persist_noclobber`, which fails
//! if another process got there first. The loser reads the winner's key. An
//! existing file is never overwritten.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use strongbox_core::StrongboxError;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::crypto;

const KEY_TYPE: &str = "oct";
const KEY_ALGORITHM: &str = "A256GCM";
const KEY_ID: &str = "root-key-1";

/// The application-wide root key. Debug output omits the key bytes.
#[derive(Clone)]
pub struct RootKey(Zeroizing<[u8; 32]>);

impl RootKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for RootKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RootKey([REDACTED])")
    }
}

#[derive(Serialize, Deserialize)]
struct KeyFile {
    kty: String,
    kid: String,
    alg: String,
    created_at: String,
    k_b64: String,
}

/// A loaded root key and where it came from.
///
/// Constructed once at startup and shared by reference (typically in an
/// `Arc`) with every service that seals or opens envelopes.
#[derive(Debug)]
pub struct KeyStore {
    path: PathBuf,
    key_id: String,
    key: RootKey,
}

impl KeyStore {
    /// Load the root key at `path`, creating it first if no file exists.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StrongboxError> {
        let path = path.as_ref();
        match read_key_file(path)? {
            Some(store) => Ok(store),
            None => create_key_file(path),
        }
    }

    /// Load an existing root key without ever creating one.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, StrongboxError> {
        let path = path.as_ref();
        read_key_file(path)?.ok_or_else(|| {
            StrongboxError::KeyUnavailable(format!("no root key file at {}", path.display()))
        })
    }

    pub fn root_key(&self) -> &RootKey {
        &self.key
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `Ok(None)` when the file does not exist.
fn read_key_file(path: &Path) -> Result<Option<KeyStore>, StrongboxError> {
    let contents = match std::fs::read(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(StrongboxError::KeyUnavailable(format!(
                "cannot read {}: {e}",
                path.display()
            )));
        }
    };
    let store = parse_key_file(path, &contents)?;
    debug!(path = %path.display(), kid = %store.key_id, "root key loaded");
    Ok(Some(store))
}

fn parse_key_file(path: &Path, contents: &[u8]) -> Result<KeyStore, StrongboxError> {
    let corrupt = |reason: String| StrongboxError::KeyCorrupt(format!("{}: {reason}", path.display()));

    let file: KeyFile =
        serde_json::from_slice(contents).map_err(|e| corrupt(format!("invalid JSON: {e}")))?;
    if file.kty != KEY_TYPE || file.alg != KEY_ALGORITHM {
        return Err(corrupt(format!(
            "unsupported key type {}/{}",
            file.kty, file.alg
        )));
    }
    let decoded = Zeroizing::new(
        STANDARD
            .decode(file.k_b64.as_bytes())
            .map_err(|e| corrupt(format!("invalid base64: {e}")))?,
    );
    let bytes: [u8; 32] = decoded
        .as_slice()
        .try_into()
        .map_err(|_| corrupt(format!("expected 32 key bytes, found {}", decoded.len())))?;

    Ok(KeyStore {
        path: path.to_path_buf(),
        key_id: file.kid,
        key: RootKey(Zeroizing::new(bytes)),
    })
}

fn create_key_file(path: &Path) -> Result<KeyStore, StrongboxError> {
    let unavailable =
        |what: &str, e: std::io::Error| StrongboxError::KeyUnavailable(format!("{what} {}: {e}", path.display()));

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    std::fs::create_dir_all(&dir).map_err(|e| unavailable("cannot create directory for", e))?;

    let key = Zeroizing::new(crypto::generate_random_key()?);
    let file = KeyFile {
        kty: KEY_TYPE.to_string(),
        kid: KEY_ID.to_string(),
        alg: KEY_ALGORITHM.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        k_b64: STANDARD.encode(key.as_slice()),
    };
    let json = Zeroizing::new(
        serde_json::to_vec_pretty(&file)
            .map_err(|e| StrongboxError::Internal(format!("cannot encode key file: {e}")))?,
    );
    drop(file);

    // NamedTempFile is created with owner-only permissions on Unix.
    let mut staged = tempfile::NamedTempFile::new_in(&dir)
        .map_err(|e| unavailable("cannot stage key file for", e))?;
    staged
        .write_all(&json)
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| unavailable("cannot write key file for", e))?;

    match staged.persist_noclobber(path) {
        Ok(_) => {
            info!(path = %path.display(), kid = KEY_ID, "root key created");
            Ok(KeyStore {
                path: path.to_path_buf(),
                key_id: KEY_ID.to_string(),
                key: RootKey(key),
            })
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "root key created concurrently, using existing file");
            read_key_file(path)?.ok_or_else(|| {
                StrongboxError::KeyUnavailable(format!("{} vanished after creation", path.display()))
            })
        }
        Err(e) => Err(unavailable("cannot persist key file at", e.error)),
    }
}
