//! Analysis handlers

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;
use webguard_core::logic::threat::ThreatVerdict;

use crate::{AppState, AppResult};
use crate::models::{AnalyzeRequest, BatchAccepted, BatchAnalyzeRequest};

/// Analyze one URL and wait for the verdict
pub async fn single(
    State(state): State<AppState>,
    Json(req): Json<AnalyzeRequest>,
) -> AppResult<Json<ThreatVerdict>> {
    req.validate()?;

    let verdict = state.coordinator.analyze_single(req.url.trim()).await?;
    tracing::info!(url = %verdict.url, level = %verdict.level, score = verdict.score, "URL analyzed");

    Ok(Json(verdict))
}

/// Queue a batch and return its job id immediately
pub async fn batch(
    State(state): State<AppState>,
    Json(req): Json<BatchAnalyzeRequest>,
) -> AppResult<(StatusCode, Json<BatchAccepted>)> {
    req.validate()?;

    let job_id = state
        .coordinator
        .submit(req.urls, req.callback_url, req.concurrency_limit)?;
    let total = state.coordinator.get_job(&job_id)?.urls.len();

    Ok((
        StatusCode::ACCEPTED,
        Json(BatchAccepted {
            job_id,
            status: "processing".to_string(),
            total,
        }),
    ))
}
