//! Preço Real CLI - catalog intake and service checks from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Ask the agents service for a product record
//! pr-cli intake --text "leite integral 1l" --email ops@precoreal.app
//!
//! # Expand a category, or identify a product from a photo
//! pr-cli intake --category laticínios --email ops@precoreal.app
//! pr-cli intake --image ./produto.jpg --email ops@precoreal.app
//!
//! # Backend health document
//! pr-cli health
//! ```
//!
//! Configuration is read from the same environment as the console
//! (`AI_API_URL`, `FIREBASE_API_KEY`, `HEALTHCHECK_API_URL`, ...).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "pr-cli")]
#[command(author, version, about = "Preço Real console tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a catalog intake to completion
    Intake(IntakeArgs),
    /// Fetch the backend health document
    Health,
}

#[derive(Args)]
#[command(group = clap::ArgGroup::new("input").required(true).multiple(false))]
pub struct IntakeArgs {
    /// Free-text product description
    #[arg(long, group = "input")]
    text: Option<String>,

    /// Category to expand
    #[arg(long, group = "input")]
    category: Option<String>,

    /// Product photo
    #[arg(long, group = "input")]
    image: Option<PathBuf>,

    /// Administrator email
    #[arg(short, long)]
    email: String,

    /// Administrator password
    #[arg(long, env = "PR_CLI_PASSWORD", hide_env_values = true)]
    password: String,
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

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Intake(args) => commands::intake::run(args).await,
        Commands::Health => commands::health::run().await,
    }
}
