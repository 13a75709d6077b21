//! Scrape endpoint. Each `GET /metrics` queries the upstream once per meter.
//!
//! A failed scrape answers 500 without a body of metrics, so the exporter's
//! own counters (including `octopus_scrape_errors_total`) only appear on the
//! next successful scrape. Prometheus records the failure itself as `up == 0`.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    extract::State,
    http::{header::CONTENT_TYPE, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};

use crate::{collector::ConsumptionCollector, exposition};

pub const TEXT_FORMAT: &str = "text/plain; version=0.0.4; charset=utf-8";

#[derive(Clone)]
pub struct AppState {
    collector: Arc<ConsumptionCollector>,
    prometheus: PrometheusHandle,
}

impl AppState {
    pub fn new(collector: ConsumptionCollector, prometheus: PrometheusHandle) -> Self {
        Self {
            collector: Arc::new(collector),
            prometheus,
        }
    }
}

/// Install the global recorder backing the exporter's own counters.
/// Call once per process.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    PrometheusBuilder::new().install_recorder()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Bind `addr` and serve scrapes until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics endpoint listening");

    axum::serve(listener, router(state).into_make_service())
        .with_graceful_shutdown(shutdown)
        .await
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    metrics::counter!("octopus_scrapes_total").increment(1);

    let readings = match state.collector.collect().await {
        Ok(readings) => readings,
        Err(e) => {
            tracing::error!(error = %e, "scrape failed");
            metrics::counter!("octopus_scrape_errors_total").increment(1);
            // Nothing is rendered on this path, so drain histogram buckets here.
            state.prometheus.run_upkeep();
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    match exposition::render_consumption(&readings) {
        Ok(mut body) => {
            body.push_str(&state.prometheus.render());
            ([(CONTENT_TYPE, TEXT_FORMAT)], body).into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to encode consumption metrics");
            metrics::counter!("octopus_scrape_errors_total").increment(1);
            state.prometheus.run_upkeep();
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to encode metrics").into_response()
        }
    }
}
