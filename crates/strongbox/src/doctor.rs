// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox doctor` command implementation.
//!
//! Runs diagnostic checks against the configured key file and database
//! without asking for a master password.

use std::io::IsTerminal;
use std::path::Path;
use std::time::{Duration, Instant};

use strongbox_config::StrongboxConfig;
use strongbox_core::{HealthStatus, StorageAdapter};
use strongbox_storage::SqliteStorage;
use strongbox_vault::KeyStore;

use crate::commands::CliError;

/// Status of a diagnostic check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// Result of a single diagnostic check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
    pub duration: Duration,
}

impl CheckResult {
    fn new(name: &str, status: CheckStatus, message: impl Into<String>, start: Instant) -> Self {
        Self {
            name: name.to_string(),
            status,
            message: message.into(),
            duration: start.elapsed(),
        }
    }
}

/// Run the `strongbox doctor` command.
///
/// With `--plain`, disables colored output. Exits non-zero when any check fails.
pub async fn run_doctor(config: &StrongboxConfig, plain: bool) -> Result<(), CliError> {
    let use_color = !plain && std::io::stdout().is_terminal();
    let results = vec![
        check_config(config),
        check_key_file(&config.keystore.key_file),
        check_database(config).await,
    ];

    println!();
    println!("  strongbox doctor");
    println!("  {}", "-".repeat(50));
    for result in &results {
        println!("{}", render(result, use_color));
    }
    println!();

    let fail_count = results.iter().filter(|r| r.status == CheckStatus::Fail).count();
    let warn_count = results.iter().filter(|r| r.status == CheckStatus::Warn).count();
    let issues = fail_count + warn_count;
    if issues == 0 {
        println!("  All checks passed.");
    } else {
        let issue_word = if issues == 1 { "issue" } else { "issues" };
        println!("  {issues} {issue_word} found.");
    }
    println!();

    if fail_count > 0 {
        return Err(CliError::Denied(format!("{fail_count} check(s) failed")));
    }
    Ok(())
}

fn render(result: &CheckResult, use_color: bool) -> String {
    let duration_ms = result.duration.as_millis();
    if !use_color {
        let tag = match result.status {
            CheckStatus::Pass => "[OK]  ",
            CheckStatus::Warn => "[WARN]",
            CheckStatus::Fail => "[FAIL]",
        };
        return format!("    {tag} {:<14} {} ({duration_ms}ms)", result.name, result.message);
    }

    use colored::Colorize;
    let (symbol, message) = match result.status {
        CheckStatus::Pass => ("✓".green(), result.message.normal()),
        CheckStatus::Warn => ("!".yellow(), result.message.yellow()),
        CheckStatus::Fail => ("✗".red(), result.message.red()),
    };
    format!("    {symbol} {:<14} {message} ({duration_ms}ms)", result.name)
}

/// Report the effective KDF cost so weak settings are visible.
fn check_config(config: &StrongboxConfig) -> CheckResult {
    let start = Instant::now();
    let kdf = &config.kdf;
    CheckResult::new(
        "Configuration",
        CheckStatus::Pass,
        format!(
            "valid (argon2id m={} KiB, t={}, p={})",
            kdf.memory_cost, kdf.iterations, kdf.parallelism
        ),
        start,
    )
}

fn check_key_file(key_file: &str) -> CheckResult {
    let start = Instant::now();
    let path = Path::new(key_file);
    if !path.exists() {
        return CheckResult::new(
            "Root key",
            CheckStatus::Warn,
            format!("not found: {key_file} (run `strongbox keygen` or register an account)"),
            start,
        );
    }

    let keystore = match KeyStore::load(path) {
        Ok(keystore) => keystore,
        Err(e) => return CheckResult::new("Root key", CheckStatus::Fail, e.to_string(), start),
    };

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(meta) = std::fs::metadata(path) {
            let mode = meta.permissions().mode() & 0o777;
            if mode & 0o077 != 0 {
                return CheckResult::new(
                    "Root key",
                    CheckStatus::Warn,
                    format!("{} readable by others (mode {mode:o})", keystore.key_id()),
                    start,
                );
            }
        }
    }

    CheckResult::new(
        "Root key",
        CheckStatus::Pass,
        format!("{} loaded", keystore.key_id()),
        start,
    )
}

async fn check_database(config: &StrongboxConfig) -> CheckResult {
    let start = Instant::now();
    let db_path = &config.storage.database_path;
    if !Path::new(db_path).exists() {
        return CheckResult::new(
            "Database",
            CheckStatus::Warn,
            format!("not found: {db_path} (will be created on first use)"),
            start,
        );
    }

    let storage = SqliteStorage::new(config.storage.clone());
    if let Err(e) = storage.initialize().await {
        return CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start);
    }
    let health = storage.health_check().await;
    let _ = storage.close().await;

    match health {
        Ok(HealthStatus::Healthy) => {
            CheckResult::new("Database", CheckStatus::Pass, "schema current, quick_check ok", start)
        }
        Ok(HealthStatus::Degraded(detail)) => {
            CheckResult::new("Database", CheckStatus::Fail, format!("integrity: {detail}"), start)
        }
        Err(e) => CheckResult::new("Database", CheckStatus::Fail, e.to_string(), start),
    }
}
