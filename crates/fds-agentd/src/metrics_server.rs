//! `/metrics` and `/healthz` HTTP endpoints.
use std::{net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::State,
    http::{StatusCode, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fds_prometheus::PrometheusMetrics;

const TEXT_FORMAT: &str = "text/plain; version=0.0.4";

/// Build the router.
///
/// Routes:
/// - GET /metrics - Prometheus text exposition
/// - GET /healthz - liveness
pub fn router(metrics: Arc<PrometheusMetrics>) -> Router {
    Router::new()
        .route("/metrics", get(render))
        .route("/healthz", get(|| async { "ok" }))
        .with_state(metrics)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    metrics: Arc<PrometheusMetrics>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "metrics endpoint listening");
    }
    axum::serve(listener, router(metrics))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

/// Bind `addr` and serve in the background.
pub async fn spawn(
    addr: SocketAddr,
    metrics: Arc<PrometheusMetrics>,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tokio::spawn(async move {
        if let Err(e) = serve(listener, metrics, shutdown).await {
            warn!(error = %e, "metrics endpoint stopped");
        }
    });
    Ok(())
}

async fn render(State(metrics): State<Arc<PrometheusMetrics>>) -> Response {
    match metrics.encode() {
        Ok(body) => ([(CONTENT_TYPE, TEXT_FORMAT)], body).into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
