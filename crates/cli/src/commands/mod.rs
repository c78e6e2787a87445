//! Subcommand implementations.

pub mod health;
pub mod intake;

use std::io::Write;

use preco_real_admin::config::ConfigError;
use preco_real_admin::error::ConsoleError;
use preco_real_admin::identity::IdentityError;
use preco_real_core::EmailError;
use thiserror::Error;

/// Errors that end a command with exit code 1.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid email: {0}")]
    Email(#[from] EmailError),

    #[error("{0}")]
    Identity(#[from] IdentityError),

    #[error("{0}")]
    Console(#[from] ConsoleError),

    #[error("{0}")]
    NotAdmin(&'static str),

    #[error("intake ended without a result")]
    NoResult,

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// Pretty-print a JSON document on stdout.
fn print_json(value: &serde_json::Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{rendered}")?;
    Ok(())
}
