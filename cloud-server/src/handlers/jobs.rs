//! Job handlers

use axum::{extract::{State, Path}, http::StatusCode, Json};
use webguard_core::logic::batch::{JobId, JobSnapshot};

use crate::{AppState, AppResult};

/// Job state and results so far, in submission order
pub async fn get(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<Json<JobSnapshot>> {
    let job = state.coordinator.get_job(&JobId::from(job_id))?;
    Ok(Json(job.snapshot()))
}

/// Forget a job
pub async fn delete(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> AppResult<StatusCode> {
    state.coordinator.delete_job(&JobId::from(job_id))?;
    Ok(StatusCode::NO_CONTENT)
}
