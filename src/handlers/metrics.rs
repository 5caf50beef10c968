use axum::{extract::State, http::StatusCode, response::IntoResponse};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use std::sync::Arc;

use crate::AppState;

// A process holds one global recorder; routers built later share its handle
static RECORDER: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct MetricsState {
    pub handle: PrometheusHandle,
}

/// Installs the Prometheus recorder on first use
pub fn setup_metrics_recorder() -> Result<MetricsState, BuildError> {
    let handle = RECORDER.get_or_try_init(|| {
        PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Full("http_request_duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0],
            )?
            .install_recorder()
    })?;

    Ok(MetricsState { handle: handle.clone() })
}

/// Handler for the /metrics endpoint
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, state.metrics.handle.render())
}
