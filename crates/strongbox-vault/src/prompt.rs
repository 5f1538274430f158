// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master password acquisition via TTY prompt or environment variables.

use secrecy::SecretString;
use strongbox_core::StrongboxError;

/// The environment variable name for providing the master password.
pub const MASTER_PASSWORD_ENV_VAR: &str = "STRONGBOX_MASTER_PASSWORD";

/// The environment variable consulted first when a new master password is needed.
pub const NEW_MASTER_PASSWORD_ENV_VAR: &str = "STRONGBOX_NEW_MASTER_PASSWORD";

fn from_env(var: &str) -> Option<SecretString> {
    match std::env::var(var) {
        Ok(value) if !value.is_empty() => Some(SecretString::from(value)),
        _ => None,
    }
}

fn is_interactive() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdin())
}

fn read(label: &str) -> Result<String, StrongboxError> {
    rpassword::prompt_password(label)
        .map_err(|e| StrongboxError::InvalidInput(format!("failed to read password: {e}")))
}

fn no_source() -> StrongboxError {
    StrongboxError::InvalidInput(format!(
        "No master password provided. Set {MASTER_PASSWORD_ENV_VAR} or run interactively."
    ))
}

/// Get the master password from the environment or an interactive prompt.
///
/// Priority:
/// 1. `STRONGBOX_MASTER_PASSWORD` (for scripts and tests)
/// 2. Interactive TTY prompt via `rpassword`
pub fn get_master_password(label: &str) -> Result<SecretString, StrongboxError> {
    if let Some(password) = from_env(MASTER_PASSWORD_ENV_VAR) {
        return Ok(password);
    }
    if !is_interactive() {
        return Err(no_source());
    }
    let password = read(label)?;
    if password.is_empty() {
        return Err(StrongboxError::InvalidInput("empty password not allowed".into()));
    }
    Ok(SecretString::from(password))
}

/// Get a new master password, prompting twice and requiring both to match.
///
/// `STRONGBOX_NEW_MASTER_PASSWORD`, then `STRONGBOX_MASTER_PASSWORD`, are
/// taken as-is without confirmation.
pub fn get_new_master_password(label: &str) -> Result<SecretString, StrongboxError> {
    let from_vars = from_env(NEW_MASTER_PASSWORD_ENV_VAR).or_else(|| from_env(MASTER_PASSWORD_ENV_VAR));
    if let Some(password) = from_vars {
        return Ok(password);
    }
    if !is_interactive() {
        return Err(no_source());
    }
    let first = zeroize::Zeroizing::new(read(label)?);
    let second = zeroize::Zeroizing::new(read("Confirm: ")?);
    if *first != *second {
        return Err(StrongboxError::InvalidInput("passwords do not match".into()));
    }
    if first.is_empty() {
        return Err(StrongboxError::InvalidInput("empty password not allowed".into()));
    }
    Ok(SecretString::from(first.to_string()))
}
