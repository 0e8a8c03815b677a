//! cours-offline server entry point.
//!
//! Boots the offline proxy, pre-warms the current generation and serves the
//! proxy tools over MCP on stdio. Logging goes to stderr to avoid interfering
//! with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use cours_offline_client::{FetchClient, FetchConfig, OfflineProxy};
use cours_offline_core::{CacheDb, ProxyConfig};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod notifier;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = ProxyConfig::load()?;
    tracing::info!(origin = %config.origin, db_path = %config.db_path.display(), "starting cours-offline on stdio transport");

    let storage = Arc::new(CacheDb::open(&config.db_path).await?);
    let network = Arc::new(FetchClient::new(FetchConfig::from(&config))?);
    let proxy = Arc::new(OfflineProxy::new(&config, storage, network, Arc::new(notifier::LogNotifier))?);

    if let Err(err) = proxy.start().await {
        tracing::error!(error = %err, "install failed, serving with the previous generation if any");
    }

    let handler = handler::OfflineProxyServer::new(proxy);
    let server = serve_server(handler, stdio()).await?;

    server.waiting().await?;

    Ok(())
}
