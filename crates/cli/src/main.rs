//! LinkBrain CLI - Database migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! linkbrain migrate
//!
//! # Issue a bearer token for a user
//! linkbrain token issue 6f1c2a4e-8d0b-4f7e-9a55-3b2d1c0e9f88
//!
//! # Import clips exported from the old client
//! linkbrain import export.json --user 6f1c2a4e-8d0b-4f7e-9a55-3b2d1c0e9f88
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "linkbrain")]
#[command(author, version, about = "LinkBrain CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage user bearer tokens
    Token {
        #[command(subcommand)]
        action: TokenAction,
    },
    /// Import legacy clip documents for a user
    Import {
        /// JSON file: an array of clip documents, or `{"clips": [...]}`
        file: PathBuf,

        /// ID of the user who owns the clips
        #[arg(short, long)]
        user: String,
    },
}

#[derive(Subcommand)]
enum TokenAction {
    /// Issue a token for an existing user
    Issue {
        /// User ID
        user_id: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

#[allow(clippy::print_stdout)]
async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Token {
            action: TokenAction::Issue { user_id },
        } => {
            let issued = commands::token::issue(&user_id).await?;
            println!("{}", issued.token);
            println!("# {} (expires {})", issued.email, issued.expires_at.to_rfc3339());
        }
        Commands::Import { file, user } => {
            let outcome = commands::import::run(&file, &user).await?;
            println!(
                "Imported {} clips, created {} categories, skipped {}",
                outcome.imported,
                outcome.created_categories,
                outcome.skipped.len()
            );
            for skipped in &outcome.skipped {
                println!("  #{}: {}", skipped.index, skipped.reason);
            }
        }
    }
    Ok(())
}
