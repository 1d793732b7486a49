//! soulnet HTTP server binary.
//!
//! Serves encrypted snapshot storage, the soul address registry and the chat
//! proxy.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `SOULNET_DATA_DIR` — Data root (default: `./data`)
//! - `SOULNET_EPHEMERAL` / `VERCEL` — Use `/tmp/soulnet-data` instead
//! - `OPENROUTER_API_KEY` — Enables `/api/chat`
//! - `OPENROUTER_MODEL`, `OPENROUTER_SITE_URL`, `OPENROUTER_APP_NAME` — Chat settings
//! - `RUST_LOG` — Tracing filter (default: "info,soulnet=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! ```

use soulnet::config::ServerConfig;
use soulnet::server::{serve, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,soulnet=debug".into()),
        )
        .init();

    let config = ServerConfig::from_env();
    let state = AppState::from_config(&config);

    tracing::info!("soulnet server starting on {}", config.bind_addr);
    tracing::info!("Data root: {}", config.data.root().display());
    if config.openrouter.is_none() {
        tracing::warn!("OPENROUTER_API_KEY not set; /api/chat will return 500");
    }
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health               — liveness probe");
    tracing::info!("  POST /api/snapshots/upload — store envelope");
    tracing::info!("  GET  /api/snapshots/:cid   — fetch envelope");
    tracing::info!("  POST /api/chain/commit     — commit address -> cid");
    tracing::info!("  GET  /api/chain/last       — latest cid for address");
    tracing::info!("  POST /api/chat             — completion proxy");

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    serve(listener, state).await?;
    Ok(())
}
