//! Session CLI
//!
//! Command-line front end for the session lifecycle engine. Credentials
//! persist in a JSON file between invocations; the identity-provider login
//! URI is printed instead of opened.

use anyhow::Context;
use clap::{Parser, Subcommand};
use session_core::credentials::FileCredentialStore;
use session_core::secret::ExposeSecret;
use session_core::{Navigator, SessionConfig, SessionController};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "session_cli=info,session=info";

#[derive(Debug, Parser)]
#[command(name = "session-cli", version, about = "Manage an identity-gateway session")]
struct Cli {
    /// Credential file
    #[arg(long, env = "SESSION_STORE_PATH", default_value = ".session.json")]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print the derived session state
    Status,
    /// Print an access token, refreshing or starting a login if needed
    Token,
    /// Confirm the session, printing the login URI if one is required
    Login,
    /// Clear stored credentials (local only)
    Logout,
}

/// Prints the login URI for the user to open.
struct StdoutNavigator;

impl Navigator for StdoutNavigator {
    fn redirect_to(&self, uri: &str) {
        println!("Login required, open: {uri}");
    }
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    if std::env::var("SESSION_LOG_FORMAT").is_ok_and(|format| format == "json") {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let config = SessionConfig::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        client_id = %config.client_id,
        gateway_url = %config.gateway_url,
        store = %cli.store.display(),
        "Configuration loaded"
    );

    let store = Arc::new(FileCredentialStore::new(&cli.store));
    let controller = SessionController::with_http_gateway(config, store, Arc::new(StdoutNavigator))
        .context("Failed to build gateway client")?;

    match cli.command {
        Command::Status => {
            let state = controller.state()?;
            println!("{state}");
        }
        Command::Token => {
            let token = controller
                .get_access_token()
                .await
                .context("No access token available")?;
            println!("{}", token.expose_secret());
        }
        Command::Login => {
            if controller.confirm_jwt_authentication().await? {
                println!("Authenticated");
            }
        }
        Command::Logout => {
            controller.logout()?;
            println!("Logged out");
        }
    }

    Ok(())
}
