//! shellcache server entry point.
//!
//! This is the main binary that boots the MCP server on stdio transport.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use shellcache_client::{FetchConfig, HttpNetwork, Registration};
use shellcache_core::{AppConfig, CacheDb};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = Arc::new(AppConfig::load()?);
    tracing::info!(db = %config.db_path.display(), origin = %config.origin, "starting shellcache on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = Arc::new(HttpNetwork::new(FetchConfig::from(config.as_ref()))?);
    let registration = Arc::new(Registration::new(db, network, config.clone())?);

    if config.install_on_start {
        match registration.register(None).await {
            Ok(report) => tracing::info!(version = %report.version, phase = %report.phase, "registered"),
            Err(e) => tracing::error!("initial registration failed: {e}"),
        }
    }

    let handler = handler::ShellcacheServer::new(registration);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
