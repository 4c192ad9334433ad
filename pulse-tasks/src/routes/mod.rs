use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod health;
pub mod jobs;
pub mod stats;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/stats/general", get(stats::get_general_stats))
        // Internal service-to-service endpoints (no auth)
        .route("/internal/jobs/:job/run", post(jobs::run_job))
        .layer(axum::middleware::from_fn(pulse_shared::middleware::metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
