// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Subcommand implementations.
//!
//! Each command opens the key file and database, authenticates when it
//! touches secrets, does one thing, and closes the database on every path.

use std::io::{BufRead, IsTerminal};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use strongbox_config::StrongboxConfig;
use strongbox_core::{
    EntryId, EntryUpdate, LoginOutcome, NewEntry, RegisterOutcome, Session, StrongboxError,
    is_expired_at,
};
use strongbox_storage::Database;
use strongbox_vault::{
    AuthService, KeyStore, SecretStore, get_master_password, get_new_master_password, mask_secret,
};
use thiserror::Error;
use tracing::debug;

/// Failures reported to the user by a command.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Vault(#[from] StrongboxError),

    /// Login refused: wrong password, unknown account, or lockout.
    #[error("{0}")]
    Denied(String),

    #[error("{0}")]
    NotFound(String),
}

/// Field changes collected from `update` flags.
#[derive(Debug, Default)]
pub struct UpdateArgs {
    pub service: Option<String>,
    pub account_login: Option<String>,
    pub password: bool,
    pub expire_date: Option<Option<DateTime<Utc>>>,
}

struct Vault {
    db: Database,
    auth: AuthService,
    secrets: SecretStore,
}

impl Vault {
    async fn open(config: &StrongboxConfig) -> Result<Self, CliError> {
        let keystore = Arc::new(KeyStore::open(&config.keystore.key_file)?);
        let db = Database::open_with(&config.storage).await?;
        Ok(Self {
            auth: AuthService::new(db.clone(), keystore, &config.kdf),
            secrets: SecretStore::new(db.clone()),
            db,
        })
    }

    async fn authenticate(&self, login: &str) -> Result<Session, CliError> {
        let password = get_master_password("Master password: ")?;
        match self.auth.login(login, &password).await? {
            LoginOutcome::Authenticated(session) => Ok(session),
            LoginOutcome::InvalidCredentials { remaining_attempts } => Err(CliError::Denied(format!(
                "invalid login or master password ({remaining_attempts} attempt(s) left before lockout)"
            ))),
            LoginOutcome::Locked => Err(CliError::Denied("account is locked".into())),
            LoginOutcome::LockedNow => Err(CliError::Denied(
                "too many failed attempts -- account is now locked".into(),
            )),
        }
    }

    /// Close the database, then hand back the command's result.
    ///
    /// The close runs on every path; its own failure is only reported when the
    /// command succeeded.
    async fn finish<T>(self, result: Result<T, CliError>) -> Result<T, CliError> {
        let closed = self.db.close().await;
        let value = result?;
        closed?;
        Ok(value)
    }
}

/// Read a service password from stdin when piped, or prompt on a terminal.
fn read_account_password() -> Result<SecretString, CliError> {
    let password = if std::io::stdin().is_terminal() {
        rpassword::prompt_password("Account password: ")
            .map_err(|e| StrongboxError::InvalidInput(format!("failed to read password: {e}")))?
    } else {
        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| StrongboxError::InvalidInput(format!("failed to read stdin: {e}")))?;
        line.trim_end_matches(['\r', '\n']).to_string()
    };
    if password.is_empty() {
        return Err(StrongboxError::InvalidInput("account password must not be empty".into()).into());
    }
    Ok(SecretString::from(password))
}

fn format_expiry(expire_date: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(at) = expire_date else {
        return "-".to_string();
    };
    let date = at.format("%Y-%m-%d");
    if is_expired_at(expire_date, now) {
        format!("{date} (expired)")
    } else {
        date.to_string()
    }
}

pub async fn register(config: &StrongboxConfig, login: &str) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let password = get_new_master_password("New master password: ")?;
        Ok::<_, CliError>(vault.auth.register(login, &password).await?)
    }
    .await;
    match vault.finish(result).await? {
        RegisterOutcome::Registered(id) => {
            println!("registered `{}` (user {id})", login.trim());
            Ok(())
        }
        RegisterOutcome::DuplicateLogin => Err(CliError::Denied(format!(
            "login `{}` is already registered",
            login.trim()
        ))),
    }
}

pub async fn login(config: &StrongboxConfig, login: &str) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = vault.authenticate(login).await;
    let session = vault.finish(result).await?;
    println!("authenticated as `{}`", session.login);
    Ok(())
}

pub async fn add(
    config: &StrongboxConfig,
    login: &str,
    service: String,
    account_login: String,
    expire_date: Option<DateTime<Utc>>,
) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        let entry = NewEntry {
            service,
            account_login,
            account_password: read_account_password()?,
            expire_date,
        };
        Ok::<_, CliError>(vault.secrets.add(&session, entry).await?)
    }
    .await;
    let id = vault.finish(result).await?;
    println!("added entry {id}");
    Ok(())
}

pub async fn list(config: &StrongboxConfig, login: &str, json: bool) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        Ok::<_, CliError>(vault.secrets.list(&session).await?)
    }
    .await;
    let entries = vault.finish(result).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&entries)
            .map_err(|e| StrongboxError::Internal(format!("cannot render JSON: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    if entries.is_empty() {
        println!("no entries");
        return Ok(());
    }
    let now = Utc::now();
    println!("{:>5}  {:<24} {:<32} EXPIRES", "ID", "SERVICE", "LOGIN");
    for entry in &entries {
        println!(
            "{:>5}  {:<24} {:<32} {}",
            entry.id,
            entry.service,
            entry.account_login,
            format_expiry(entry.expire_date, now)
        );
    }
    Ok(())
}

pub async fn show(
    config: &StrongboxConfig,
    login: &str,
    id: EntryId,
    reveal: bool,
) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        Ok::<_, CliError>(vault.secrets.reveal(&session, id).await?)
    }
    .await;
    let Some(entry) = vault.finish(result).await? else {
        return Err(CliError::NotFound(format!("no entry {id}")));
    };

    let password = if reveal {
        entry.account_password.expose_secret().to_string()
    } else {
        mask_secret(entry.account_password.expose_secret())
    };
    println!("service:  {}", entry.service);
    println!("login:    {}", entry.account_login);
    println!("password: {password}");
    println!("expires:  {}", format_expiry(entry.expire_date, Utc::now()));
    if entry.legacy {
        println!("note:     stored unencrypted -- run `strongbox migrate`");
    }
    Ok(())
}

pub async fn update(
    config: &StrongboxConfig,
    login: &str,
    id: EntryId,
    args: UpdateArgs,
) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        let account_password = if args.password {
            Some(read_account_password()?)
        } else {
            None
        };
        let update = EntryUpdate {
            service: args.service,
            account_login: args.account_login,
            account_password,
            expire_date: args.expire_date,
        };
        Ok::<_, CliError>(vault.secrets.update(&session, id, update).await?)
    }
    .await;
    if !vault.finish(result).await? {
        return Err(CliError::NotFound(format!("no entry {id}")));
    }
    println!("updated entry {id}");
    Ok(())
}

pub async fn delete(config: &StrongboxConfig, login: &str, id: EntryId) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        Ok::<_, CliError>(vault.secrets.delete(&session, id).await?)
    }
    .await;
    if !vault.finish(result).await? {
        return Err(CliError::NotFound(format!("no entry {id}")));
    }
    println!("deleted entry {id}");
    Ok(())
}

pub async fn passwd(config: &StrongboxConfig, login: &str) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        let new_password = get_new_master_password("New master password: ")?;
        Ok::<_, CliError>(vault.auth.change_master_password(&session, &new_password).await?)
    }
    .await;
    if !vault.finish(result).await? {
        return Err(CliError::Denied(
            "account changed while updating the password; try again".into(),
        ));
    }
    println!("master password changed");
    Ok(())
}

pub async fn migrate(config: &StrongboxConfig, login: &str) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = async {
        let session = vault.authenticate(login).await?;
        Ok::<_, CliError>(vault.secrets.migrate_legacy_entries(&session).await?)
    }
    .await;
    let report = vault.finish(result).await?;
    println!(
        "encrypted {} legacy entr{}, {} already encrypted",
        report.migrated.len(),
        if report.migrated.len() == 1 { "y" } else { "ies" },
        report.already_encrypted
    );
    if !report.skipped.is_empty() {
        println!("{} entries changed during migration; run again", report.skipped.len());
    }
    Ok(())
}

pub async fn status(config: &StrongboxConfig, login: &str) -> Result<(), CliError> {
    let vault = Vault::open(config).await?;
    let result = vault.auth.account_status(login).await.map_err(CliError::from);
    let Some(status) = vault.finish(result).await? else {
        return Err(CliError::NotFound(format!("no account `{}`", login.trim())));
    };
    println!("login:           {}", status.login);
    println!("state:           {}", status.state);
    println!("failed attempts: {}", status.failed_attempts);
    println!("updated:         {}", status.updated_at);
    Ok(())
}

pub fn keygen(config: &StrongboxConfig) -> Result<(), CliError> {
    let path = std::path::Path::new(&config.keystore.key_file);
    let existed = path.exists();
    let keystore = KeyStore::open(path)?;
    debug!(existed, "keygen");
    let verb = if existed { "exists" } else { "created" };
    println!("root key {} {verb} at {}", keystore.key_id(), keystore.path().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn expiry_formatting() {
        let now = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(format_expiry(None, now), "-");
        assert_eq!(format_expiry(Some(now + Duration::days(31)), now), "2030-02-01");
        assert_eq!(
            format_expiry(Some(now - Duration::days(1)), now),
            "2029-12-31 (expired)"
        );
        assert_eq!(format_expiry(Some(now), now), "2030-01-01 (expired)");
    }

    #[test]
    fn vault_errors_pass_through_unchanged() {
        let err: CliError = StrongboxError::AuthenticationFailed.into();
        assert_eq!(err.to_string(), StrongboxError::AuthenticationFailed.to_string());
    }
}
