//! Prometheus scrape endpoint (`GET /metrics`) backed by the gauge registry.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use tracing::info;

use super::GaugeRegistry;

pub fn router(registry: Arc<GaugeRegistry>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(registry)
}

/// Bind `0.0.0.0:<port>` and serve until the process exits.
pub async fn serve(registry: Arc<GaugeRegistry>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind metrics exporter on {}", addr))?;

    info!("Prometheus exporter listening on http://{}/metrics", addr);
    axum::serve(listener, router(registry))
        .await
        .context("Metrics exporter stopped")
}

async fn metrics_handler(State(registry): State<Arc<GaugeRegistry>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        registry.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{Gauge, MetricsSink};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn serves_rendered_gauges() {
        let registry = Arc::new(GaugeRegistry::new());
        registry.set(Gauge::UpsStatus, &[], 1.0);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(registry)).await.unwrap();
        });

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /metrics HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();

        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("ups_status 1"));
    }
}
