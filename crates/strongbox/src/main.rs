// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strongbox - a personal credential vault.
//!
//! This is the binary entry point: it loads configuration, sets up logging,
//! and dispatches one subcommand per invocation.

mod commands;
mod doctor;

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand};
use strongbox_core::EntryId;

/// Strongbox - a personal credential vault.
#[derive(Parser, Debug)]
#[command(name = "strongbox", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Account selection shared by every authenticated command.
#[derive(Args, Debug)]
struct AccountArgs {
    /// Vault account login.
    #[arg(short, long)]
    login: String,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a vault account.
    Register(AccountArgs),
    /// Check a master password without changing anything else.
    Login(AccountArgs),
    /// Store a new service credential. The password is read from stdin or a prompt.
    Add {
        #[command(flatten)]
        account: AccountArgs,
        /// Service the credential belongs to.
        #[arg(long)]
        service: String,
        /// Login at the service.
        #[arg(long)]
        account_login: String,
        /// Expiry date (YYYY-MM-DD or RFC 3339).
        #[arg(long, value_parser = parse_expiry)]
        expires: Option<DateTime<Utc>>,
    },
    /// List stored credentials, newest first.
    List {
        #[command(flatten)]
        account: AccountArgs,
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Show one credential with its password masked.
    Show {
        #[command(flatten)]
        account: AccountArgs,
        /// Entry id from `list`.
        #[arg(long)]
        id: i64,
        /// Print the password in full.
        #[arg(long)]
        reveal: bool,
    },
    /// Change fields of a stored credential.
    Update {
        #[command(flatten)]
        account: AccountArgs,
        /// Entry id from `list`.
        #[arg(long)]
        id: i64,
        #[arg(long)]
        service: Option<String>,
        #[arg(long)]
        account_login: Option<String>,
        /// Read a new password from stdin or a prompt.
        #[arg(long)]
        password: bool,
        /// New expiry date (YYYY-MM-DD or RFC 3339).
        #[arg(long, value_parser = parse_expiry, conflicts_with = "no_expiry")]
        expires: Option<DateTime<Utc>>,
        /// Remove the expiry date.
        #[arg(long)]
        no_expiry: bool,
    },
    /// Delete a stored credential.
    Delete {
        #[command(flatten)]
        account: AccountArgs,
        /// Entry id from `list`.
        #[arg(long)]
        id: i64,
    },
    /// Change the master password.
    Passwd(AccountArgs),
    /// Encrypt credentials stored before encryption was introduced.
    Migrate(AccountArgs),
    /// Show lock state and failed-attempt count of an account.
    Status(AccountArgs),
    /// Create the root key file if it does not exist yet.
    Keygen,
    /// Run diagnostic checks on configuration, key file, and database.
    Doctor {
        /// Disable colored output.
        #[arg(long)]
        plain: bool,
    },
}

/// Parse `YYYY-MM-DD` (midnight UTC) or a full RFC 3339 timestamp.
fn parse_expiry(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc())
            .ok_or_else(|| format!("invalid date: {value}"));
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| format!("expected YYYY-MM-DD or RFC 3339, got `{value}`"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => strongbox_config::load_and_validate_path(path),
        None => strongbox_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            strongbox_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let result = match cli.command {
        Commands::Register(a) => commands::register(&config, &a.login).await,
        Commands::Login(a) => commands::login(&config, &a.login).await,
        Commands::Add {
            account,
            service,
            account_login,
            expires,
        } => commands::add(&config, &account.login, service, account_login, expires).await,
        Commands::List { account, json } => commands::list(&config, &account.login, json).await,
        Commands::Show {
            account,
            id,
            reveal,
        } => commands::show(&config, &account.login, EntryId(id), reveal).await,
        Commands::Update {
            account,
            id,
            service,
            account_login,
            password,
            expires,
            no_expiry,
        } => {
            let expire_date = if no_expiry { Some(None) } else { expires.map(Some) };
            let changes = commands::UpdateArgs {
                service,
                account_login,
                password,
                expire_date,
            };
            commands::update(&config, &account.login, EntryId(id), changes).await
        }
        Commands::Delete { account, id } => {
            commands::delete(&config, &account.login, EntryId(id)).await
        }
        Commands::Passwd(a) => commands::passwd(&config, &a.login).await,
        Commands::Migrate(a) => commands::migrate(&config, &a.login).await,
        Commands::Status(a) => commands::status(&config, &a.login).await,
        Commands::Keygen => commands::keygen(&config),
        Commands::Doctor { plain } => doctor::run_doctor(&config, plain).await,
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing with `RUST_LOG` taking precedence over the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "strongbox={level},strongbox_vault={level},strongbox_storage={level},warn",
            level = log_level.to_ascii_lowercase()
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}
