//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;
use webguard_core::logic::analysis::AnalysisError;
use webguard_core::logic::batch::BatchError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    // Resource errors
    NotFound(String),

    // Validation errors
    ValidationError(String),

    // Analysis errors
    FetchFailed(String),
    Unprocessable(String),
    Timeout(String),

    // Database errors
    DatabaseError(String),
    ServiceUnavailable(String),

    // Generic errors
    InternalError(String),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            AppError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            AppError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::NotFound(msg)
            | AppError::ValidationError(msg)
            | AppError::FetchFailed(msg)
            | AppError::Unprocessable(msg)
            | AppError::Timeout(msg)
            | AppError::ServiceUnavailable(msg) => msg.as_str(),
            AppError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                "Database error occurred"
            }
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error"
            }
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<BatchError> for AppError {
    fn from(err: BatchError) -> Self {
        match err {
            BatchError::NotFound(id) => AppError::NotFound(format!("Job not found: {}", id)),
            BatchError::EmptyBatch
            | BatchError::TooLarge { .. }
            | BatchError::InvalidConcurrency(_)
            | BatchError::InvalidCallbackUrl(_) => AppError::ValidationError(err.to_string()),
            BatchError::DuplicateJob(_) => AppError::InternalError(err.to_string()),
        }
    }
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::Fetch { .. } => AppError::FetchFailed(err.to_string()),
            AnalysisError::Extraction { .. } | AnalysisError::Fusion { .. } => {
                AppError::Unprocessable(err.to_string())
            }
            AnalysisError::Timeout { .. } => AppError::Timeout(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use webguard_core::logic::analysis::FetchError;
    use webguard_core::logic::batch::JobId;

    #[test]
    fn test_analysis_errors_map_to_statuses() {
        let fetch: AppError = AnalysisError::Fetch {
            url: "http://a".to_string(),
            source: FetchError::Status(500),
        }
        .into();
        assert_eq!(fetch.status(), StatusCode::BAD_GATEWAY);

        let timeout: AppError = AnalysisError::Timeout {
            url: "http://a".to_string(),
            budget: Duration::from_secs(1),
        }
        .into();
        assert_eq!(timeout.status(), StatusCode::GATEWAY_TIMEOUT);
    }

    #[test]
    fn test_batch_errors_map_to_statuses() {
        let missing: AppError = BatchError::NotFound(JobId::from("nope")).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let empty: AppError = BatchError::EmptyBatch.into();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);
    }
}
