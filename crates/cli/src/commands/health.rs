//! `pr-cli health`.

use preco_real_admin::config::AdminConfig;
use preco_real_admin::services::Services;

use super::{CliError, print_json};

/// Fetch and print the health-check document.
pub async fn run() -> Result<(), CliError> {
    let config = AdminConfig::from_env()?;
    let services = Services::new(config.http_client()?, config.services.clone());

    let status = services.health()?.status().await?;
    print_json(&status)
}
