use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tracing::info;

pub const ALIVE: &str = "Bot is running!";

pub fn router() -> Router {
    Router::new()
        .route("/", get(alive))
        .route("/health", get(alive))
}

async fn alive() -> &'static str {
    ALIVE
}

/// Answers the hosting platform's liveness probe on `0.0.0.0:port`.
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("cannot bind health server to {}", addr))?;
    info!(%addr, "Health server listening");
    axum::serve(listener, router()).await.context("health server stopped")?;
    Ok(())
}
