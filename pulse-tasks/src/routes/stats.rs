use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use pulse_shared::errors::{AppError, AppResult, ErrorCode};
use pulse_shared::types::api::ApiResponse;

use crate::models::GeneralStats;
use crate::services::general_stats::{cached_general_stats, refresh_general_stats};
use crate::AppState;

/// GET /stats/general
/// Returns the cached user, project and pageview totals, recomputing them on a
/// cache miss. Self-hosted deployments always get zeros.
pub async fn get_general_stats(
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<GeneralStats>>> {
    if state.backends.self_hosted {
        return Ok(Json(ApiResponse::ok(GeneralStats::default())));
    }

    let unavailable = |e: crate::error::TaskError| {
        tracing::error!(error = %e, "general stats unavailable");
        AppError::new(ErrorCode::StatsUnavailable, "general stats are temporarily unavailable")
    };

    if let Some(stats) = cached_general_stats(&state.backends).await.map_err(unavailable)? {
        return Ok(Json(ApiResponse::ok(stats)));
    }

    let stats = refresh_general_stats(&state.backends)
        .await
        .map_err(unavailable)?
        .unwrap_or_default();

    Ok(Json(ApiResponse::ok(stats)))
}
