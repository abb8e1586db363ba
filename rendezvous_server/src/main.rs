//! Signaling server entry point
//!
//! Reads configuration from the environment, installs logging and serves
//! until Ctrl-C.

use anyhow::{Context, Result};
use rendezvous_server::{Server, ServerConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("rendezvous_server=info,rendezvous_signaling=info")),
        )
        .init();

    let config = ServerConfig::from_env();
    info!(
        "Starting signaling server on {} (send timeout: {:?}, prune empty rooms: {})",
        config.addr, config.send_timeout, config.prune_empty_rooms
    );

    let server = Server::bind(config.clone())
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
