//! Rakuda CLI - Database migrations and operational tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply pending database migrations
//! rakuda migrate
//!
//! # Seed the database with demo catalog data
//! rakuda seed
//!
//! # Issue an operator session token
//! rakuda session issue --label "meg-laptop"
//!
//! # Issue a short-lived token for a script
//! rakuda session issue --label "repricer-cron" --ttl-hours 24
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations (embedded in the API crate)
//! - `seed` - Seed the database with a demo catalog, orders, and templates
//! - `session issue` - Mint an operator bearer token and print it once

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "rakuda")]
#[command(author, version, about = "Rakuda CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed the database with demo data
    Seed,
    /// Manage operator sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Issue a new session token
    Issue {
        /// Who or what the session is for (shows up in the audit log)
        #[arg(short, long)]
        label: String,

        /// Session lifetime in hours
        #[arg(long, default_value_t = 720)]
        ttl_hours: i64,
    },
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::demo().await?,
        Commands::Session { action } => match action {
            SessionAction::Issue { label, ttl_hours } => {
                commands::session::issue(&label, ttl_hours).await?;
            }
        },
    }
    Ok(())
}
