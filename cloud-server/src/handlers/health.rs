//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;
use webguard_core::logic::batch::JobCounts;
use webguard_core::logic::callback::DeliveryStats;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    environment: String,
    database: bool,
    jobs: JobCounts,
    callbacks: DeliveryStats,
}

pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        environment: state.config.environment.clone(),
        database: state.pool.is_some(),
        jobs: state.coordinator.store().counts(),
        callbacks: state.coordinator.dispatcher().stats(),
    })
}
