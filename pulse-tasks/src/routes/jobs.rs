use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;

use pulse_shared::errors::{AppError, AppResult, ErrorCode};
use pulse_shared::types::api::ApiResponse;

use crate::scheduler::{Job, JobOutcome};
use crate::AppState;

/// POST /internal/jobs/:job/run
/// Runs a scheduled job immediately and returns its outcome.
pub async fn run_job(
    State(state): State<Arc<AppState>>,
    Path(job): Path<String>,
) -> AppResult<Json<ApiResponse<JobOutcome>>> {
    let job: Job = job
        .parse()
        .map_err(|e: crate::scheduler::UnknownJob| AppError::new(ErrorCode::JobNotFound, e.to_string()))?;

    tracing::info!(job = %job, "manual job trigger");

    match state.scheduler.trigger(job).await {
        Some(outcome) => Ok(Json(ApiResponse::ok(outcome))),
        None => Err(AppError::new(
            ErrorCode::JobAlreadyRunning,
            format!("{job} is already running"),
        )),
    }
}
