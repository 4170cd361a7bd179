use std::net::SocketAddr;

use axum::{Router, routing::get};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router() -> Router {
    // /health is preferred; /healthz for kubelet probes written against it
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
}

pub async fn run_http_server(
    addr: SocketAddr,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("RMO HTTP listening on {}", addr);
    axum::serve(listener, router())
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await?;
    Ok(())
}
