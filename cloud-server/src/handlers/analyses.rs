//! Stored verdict history

use axum::{extract::{State, Query}, Json};
use validator::Validate;

use crate::{AppState, AppResult, AppError};
use crate::models::{AnalysisFilter, AnalysisRecord};

/// List stored verdicts, newest first
pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<AnalysisFilter>,
) -> AppResult<Json<Vec<AnalysisRecord>>> {
    filter.validate()?;

    let pool = state
        .pool
        .as_ref()
        .ok_or_else(|| AppError::ServiceUnavailable("Persistence is not configured".to_string()))?;

    let records = AnalysisRecord::list(pool, &filter).await?;
    Ok(Json(records))
}
