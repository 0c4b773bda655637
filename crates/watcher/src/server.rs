//! Readiness endpoint. Answers with a static message and performs no work.

use std::net::SocketAddr;

use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;

/// Body returned by `GET /`.
pub const READY_MESSAGE: &str = "Thread watcher is running.";

/// Router serving `/` and `/healthz`.
pub fn router() -> Router {
    Router::new()
        .route("/", get(|| async { READY_MESSAGE }))
        .route("/healthz", get(|| async { "ok" }))
}

/// Bind and serve the readiness router until the task is dropped.
pub async fn serve(addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "Readiness endpoint listening");
    axum::serve(listener, router()).await
}
