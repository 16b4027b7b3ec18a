mod bootstrap;
mod health;
pub mod offers;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use homekey_core::config::{AppConfig, LoadOptions};
use tracing::{info, warn};

fn init_logging(config: &AppConfig) {
    use homekey_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    let router = health::router(app.db_pool.clone()).merge(offers::router(app.db_pool.clone()));

    info!(
        event_name = "system.server.started",
        bind_address = %address,
        "homekey-server listening"
    );

    let drain_deadline = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let server = axum::serve(listener, router)
        .with_graceful_shutdown(async {
            wait_for_shutdown().await;
            info!(event_name = "system.server.stopping", "shutdown signal received, draining");
        })
        .into_future();

    tokio::select! {
        result = server => result?,
        () = async {
            wait_for_shutdown().await;
            tokio::time::sleep(drain_deadline).await;
        } => {
            warn!(
                event_name = "system.server.drain_timeout",
                "graceful shutdown deadline exceeded, exiting"
            );
        }
    }

    app.db_pool.close().await;
    info!(event_name = "system.server.stopped", "homekey-server stopped");

    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
}
