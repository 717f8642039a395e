//! Funnel metrics and liveness.

use std::time::Instant;

use axum::extract::State;
use funnelbot_core::metrics::MetricsSnapshot;
use serde::Serialize;

use crate::http::response::ApiResponse;
use crate::state::AppState;

/// GET /api/v1/metrics
pub async fn get_metrics(State(state): State<AppState>) -> ApiResponse<MetricsSnapshot> {
    let start = Instant::now();
    ApiResponse::success(state.service.metrics().snapshot(), start)
}

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub conversations: usize,
    pub pending_followups: usize,
}

/// GET /api/v1/health
pub async fn health(State(state): State<AppState>) -> ApiResponse<Health> {
    let start = Instant::now();
    ApiResponse::success(
        Health {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
            uptime_secs: state.started_at.elapsed().as_secs(),
            conversations: state.service.dispatcher().store().len(),
            pending_followups: state.service.followups().pending_count(),
        },
        start,
    )
}
