//! # Ember Server
//!
//! HTTP comet relay: JSONP long-polling pub/sub fan-out.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default settings
//! ember
//!
//! # Run with a config file on one of the default paths
//! # (ember.toml, /etc/ember/ember.toml, ~/.config/ember/ember.toml)
//!
//! # Run with environment variables
//! EMBER_PORT=8100 EMBER_HOST=0.0.0.0 ember
//! ```

mod config;
mod handlers;
mod metrics;
mod sink;
mod sweeper;

use anyhow::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ember=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = config::Config::load()?;
    config.validate()?;

    tracing::info!("Starting ember server on {}:{}", config.host, config.port);

    // Initialize metrics
    metrics::init_metrics();

    // Start the server
    handlers::run_server(config).await?;

    Ok(())
}
