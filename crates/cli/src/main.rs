//! Shelfmark CLI - stress harnesses and admin tools.
//!
//! # Usage
//!
//! ```bash
//! # Exercise database constraints directly (service-role key)
//! sm-cli stress db
//!
//! # Exercise the admin REST API with an existing token
//! sm-cli stress api --base-url http://localhost:3001 --token "$ADMIN_TOKEN"
//!
//! # ...or let the harness sign in
//! sm-cli stress api --email owner@shop.example --password "$ADMIN_PASSWORD"
//!
//! # Check an email against the admin allow-list
//! sm-cli admin check owner@shop.example
//! ```
//!
//! # Commands
//!
//! - `stress db` - Database-layer stress cases
//! - `stress api` - Admin API stress cases
//! - `admin check` - Allow-list membership

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

use shelfmark_cli::commands::{
    self,
    stress::{
        api::{ApiCredentials, ApiHarness, DEFAULT_BASE_URL},
        db::DbHarness,
    },
};

#[derive(Parser)]
#[command(name = "sm-cli")]
#[command(author, version, about = "Shelfmark CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run stress harnesses
    Stress {
        #[command(subcommand)]
        target: StressTarget,
    },
    /// Admin allow-list tools
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Subcommand)]
enum StressTarget {
    /// Stress the database layer directly
    Db,
    /// Stress the admin REST API
    Api {
        /// Admin API base URL
        #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_BASE_URL)]
        base_url: String,

        /// Bearer token for admin routes
        #[arg(long, env = "ADMIN_TOKEN", hide_env_values = true)]
        token: Option<String>,

        /// Admin email (used when no token is given)
        #[arg(long, env = "ADMIN_EMAIL")]
        email: Option<String>,

        /// Admin password (used when no token is given)
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Check whether an email is on the admin allow-list
    Check {
        /// Email address to check
        email: String,
    },
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            tracing::error!("Command failed: {e}");
            std::process::exit(1);
        }
    }
}

/// Run a command; `Ok(false)` means it ran but reported failure.
async fn run(cli: Cli) -> Result<bool, Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Stress { target } => {
            let report = match target {
                StressTarget::Db => DbHarness::from_env()?.run().await,
                StressTarget::Api {
                    base_url,
                    token,
                    email,
                    password,
                } => {
                    let credentials = credentials(token, email, password)?;
                    ApiHarness::connect(&base_url, credentials).await?.run().await
                }
            };
            Ok(report.all_passed())
        }
        Commands::Admin { action } => match action {
            AdminAction::Check { email } => Ok(commands::admin::check(&email)?),
        },
    }
}

fn credentials(
    token: Option<String>,
    email: Option<String>,
    password: Option<String>,
) -> Result<ApiCredentials, Box<dyn std::error::Error>> {
    match (token, email, password) {
        (Some(token), _, _) => Ok(ApiCredentials::Token(SecretString::from(token))),
        (None, Some(email), Some(password)) => Ok(ApiCredentials::Password {
            email,
            password: SecretString::from(password),
        }),
        _ => Err("set ADMIN_TOKEN, or ADMIN_EMAIL and ADMIN_PASSWORD".into()),
    }
}
