//! Studio CLI - migrations, content seeding and storage maintenance.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! studio-cli migrate
//!
//! # Load services and projects from YAML
//! studio-cli seed --file content.yaml --email owner@example.com
//!
//! # List storage folders that no project owns
//! studio-cli media audit --email owner@example.com
//! ```
//!
//! Passwords are read from `STUDIO_ADMIN_PASSWORD` when `--password` is not
//! given. Supabase settings come from the same variables the site uses.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

#[derive(Parser)]
#[command(name = "studio-cli")]
#[command(author, version, about = "Studio site CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Admin credentials for commands that write to the hosted project.
#[derive(clap::Args)]
struct Credentials {
    /// Admin email address
    #[arg(short, long, env = "STUDIO_ADMIN_EMAIL")]
    email: String,

    /// Admin password
    #[arg(short, long, env = "STUDIO_ADMIN_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run session-store database migrations
    Migrate,
    /// Create or update services and projects from a YAML file
    Seed {
        /// Path to the content file
        #[arg(short, long)]
        file: PathBuf,

        #[command(flatten)]
        credentials: Credentials,
    },
    /// Inspect the media bucket
    Media {
        #[command(subcommand)]
        action: MediaAction,
    },
}

#[derive(Subcommand)]
enum MediaAction {
    /// List storage folders with no matching project
    Audit {
        #[command(flatten)]
        credentials: Credentials,
    },
}

#[tokio::main]
async fn main() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "studio_cli=info,studio_site=info".into());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { file, credentials } => {
            commands::seed::run(
                &file,
                &credentials.email,
                &SecretString::from(credentials.password),
            )
            .await?;
        }
        Commands::Media { action } => match action {
            MediaAction::Audit { credentials } => {
                commands::media::audit(
                    &credentials.email,
                    &SecretString::from(credentials.password),
                )
                .await?;
            }
        },
    }
    Ok(())
}
