//! HabitFlow CLI - a terminal client for the HabitFlow habit tracker.
//!
//! This application signs in against the HabitFlow API, keeps the session
//! across runs and shows habits and profile stats.

mod commands;

use std::io;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use habitflow_core::auth::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore, Navigator,
    LOGIN_ROUTE,
};
use habitflow_core::config::CredentialBackend;
use habitflow_core::{ApiClient, AuthSession, Config};

const USAGE: &str = "\
Usage: habitflow <command>

Commands:
  login [username]             Sign in (password is prompted; defaults to the last user)
  register <username> <email>  Create an account
  logout                       Sign out and forget saved tokens
  whoami                       Show the signed-in user
  habits                       List habits with today's status
  today                        List habits due today
  profile                      Show profile stats

Environment:
  REACT_APP_API_URL            API base URL (default http://localhost:8000/api/v1)
  HABITFLOW_TIMEOUT_MS         Request timeout in milliseconds
  RUST_LOG                     Log filter, e.g. RUST_LOG=debug";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

/// Tells the user to sign in again when the session cannot be refreshed.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn current_route(&self) -> String {
        String::new()
    }

    fn redirect_to_login(&self) {
        eprintln!("Your session has expired. Run `habitflow login <username>` to sign in again.");
        info!(route = LOGIN_ROUTE, "Redirected to login");
    }
}

fn credential_store(config: &Config) -> Result<Arc<dyn CredentialStore>> {
    Ok(match config.credential_backend {
        CredentialBackend::File => Arc::new(FileCredentialStore::new(config.data_dir()?)),
        CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new()),
        CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    let mut config = Config::load()?.with_env();
    let store = credential_store(&config)?;
    let client = ApiClient::from_config(&config, store, Arc::new(TerminalNavigator))?;
    info!(base_url = client.base_url(), "HabitFlow CLI starting");

    let session = AuthSession::new(client);

    match (command.as_str(), &args[1..]) {
        ("login", rest @ ([] | [_])) => {
            let Some(username) = config.login_username(rest.first().map(String::as_str)) else {
                eprintln!("{}", USAGE);
                std::process::exit(2);
            };
            commands::login(&session, &username).await?;
            config.last_username = Some(username);
            config.save()?;
        }
        ("register", [username, email]) => commands::register(&session, username, email).await?,
        ("logout", []) => commands::logout(&session),
        ("whoami", []) => commands::whoami(&session).await?,
        ("habits", []) => commands::habits(&session).await?,
        ("today", []) => commands::today(&session).await?,
        ("profile", []) => commands::profile(&session).await?,
        _ => {
            eprintln!("{}", USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
