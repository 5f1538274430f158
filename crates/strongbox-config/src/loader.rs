// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./strongbox.toml` > `~/.config/strongbox/strongbox.toml` >
//! `/etc/strongbox/strongbox.toml` with environment variable overrides via `STRONGBOX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::StrongboxConfig;

/// `STRONGBOX_*` variables that belong to the password prompt.
const PROMPT_ONLY_VARS: &[&str] = &["master_password", "new_master_password"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/strongbox/strongbox.toml` (system-wide)
/// 3. `~/.config/strongbox/strongbox.toml` (user XDG config)
/// 4. `./strongbox.toml` (local directory)
/// 5. `STRONGBOX_*` environment variables
pub fn load_config() -> Result<StrongboxConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StrongboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrongboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading (exposed for diagnostic use).
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::file("/etc/strongbox/strongbox.toml"))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file("strongbox.toml"))
        .merge(env_provider())
}

/// `~/.config/strongbox/strongbox.toml`, when the platform has a config dir.
pub(crate) fn user_config_path() -> Option<std::path::PathBuf> {
    dirs::config_dir().map(|d| d.join("strongbox/strongbox.toml"))
}

/// Create the environment variable provider using explicit `map()` for section-to-dot mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `STRONGBOX_STORAGE_DATABASE_PATH` must map to
/// `storage.database_path`, not `storage.database.path`.
///
/// The master password variables are read by the passphrase prompt, never by
/// the config layer, so they are filtered out here.
fn env_provider() -> Env {
    Env::prefixed("STRONGBOX_")
        .filter(|key| {
            !PROMPT_ONLY_VARS
                .iter()
                .any(|var| key.as_str().eq_ignore_ascii_case(var))
        })
        .map(|key| {
            let key_str = key.as_str();
            let mapped = key_str
                .replacen("storage_", "storage.", 1)
                .replacen("keystore_", "keystore.", 1)
                .replacen("kdf_", "kdf.", 1)
                .replacen("logging_", "logging.", 1);
            mapped.into()
        })
}
