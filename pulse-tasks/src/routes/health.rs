use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pulse_shared::types::api::{HealthCheck, HealthResponse};

use crate::backends::USERS_COUNT_KEY;
use crate::AppState;

pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let cache = match state.backends.cache.get(USERS_COUNT_KEY).await {
        Ok(_) => HealthCheck::healthy("cache"),
        Err(e) => HealthCheck::unhealthy("cache", e.to_string()),
    };

    Json(HealthResponse::healthy("pulse-tasks", env!("CARGO_PKG_VERSION")).with_checks(vec![cache]))
}

/// GET /metrics
/// Prometheus text exposition; empty when no recorder is installed.
pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
