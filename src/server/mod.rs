//! HTTP server for snapshot storage, the address registry and chat.
//!
//! # Endpoints
//!
//! - `GET  /health`                — Liveness probe
//! - `POST /api/snapshots/upload`  — Store an encrypted envelope
//! - `GET  /api/snapshots/:cid`    — Fetch an envelope by CID
//! - `POST /api/chain/commit`      — Commit `{soulAddress, cid}`
//! - `GET  /api/chain/last`        — Latest commit for `?soulAddress=`
//! - `POST /api/chat`              — Completion proxy
//!
//! The server only ever sees ciphertext; it holds no key material.

pub mod routes;

#[cfg(test)]
mod e2e_tests;

pub use routes::{app_router, AppState};

/// Serve the router on an already-bound listener until the task is dropped.
pub async fn serve(listener: tokio::net::TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, app_router(state)).await
}
