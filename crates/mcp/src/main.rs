//! Homekey MCP Server Binary
//!
//! ## Usage
//!
//! ```bash
//! # Run with the default database
//! homekey-mcp
//!
//! # Run against a specific database
//! HOMEKEY_DATABASE_URL=sqlite://offers.db homekey-mcp
//! ```

use anyhow::Result;
use tracing::info;

use homekey_core::config::{AppConfig, LoadOptions};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;

    // stdout carries the MCP protocol, so logs go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(config.logging.level.clone())
        .init();

    info!(database_url = %config.database.url, "starting Homekey MCP server");

    let pool = homekey_db::connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await?;
    homekey_db::migrations::run_pending(&pool).await?;

    homekey_mcp::HomekeyMcpServer::new(pool).run_stdio().await
}
