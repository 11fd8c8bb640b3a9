mod domain;
mod clients;
mod config;
mod error;

mod app_system;

#[cfg(test)]
mod mock_framework;

mod odata_framework;
mod product;

use tracing::{error, info};
use crate::app_system::{serve, setup_tracing};
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), String> {
    // Setup tracing once for the entire application
    setup_tracing();

    info!("Starting product gateway");

    let config = Config::load().map_err(|e| {
        error!(error = %e, "Configuration rejected");
        e.to_string()
    })?;

    serve(config).await?;

    info!("Application completed successfully");
    Ok(())
}
