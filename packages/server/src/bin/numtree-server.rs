//! Numbers Tree HTTP Server Binary
//!
//! # Usage
//!
//! ```bash
//! # Start with default settings (127.0.0.1:3001, default DB path)
//! NUMTREE_JWT_SECRET=$(openssl rand -hex 32) cargo run --bin numtree-server
//!
//! # Custom port and database
//! NUMTREE_PORT=3002 NUMTREE_DB_PATH=/tmp/numtree.db NUMTREE_JWT_SECRET=... cargo run --bin numtree-server
//! ```
//!
//! # Environment Variables
//!
//! - `NUMTREE_HOST`, `NUMTREE_PORT`: Listen address (default: 127.0.0.1:3001)
//! - `NUMTREE_DB_PATH`: Database file (default: ~/.numtree/database/numtree.db)
//! - `CORS_ALLOW_ORIGIN`: Comma separated browser origins (default: http://localhost:5173)
//! - `NUMTREE_SUMMARY_PAGE_SIZE`: Largest tree list page (default: 50, at most 500)
//! - `NUMTREE_JWT_SECRET`: Token signing key, at least 32 bytes (required)
//! - `RUST_LOG`: Logging level (e.g., "info", "debug", "trace")

use numtree_server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    tracing::info!("🚀 Numbers Tree HTTP Server");
    tracing::info!("==================================");

    let config = ServerConfig::from_env()?;
    tracing::info!("📡 Listen: {}", config.bind_addr());

    numtree_server::start_server(config).await?;

    Ok(())
}
