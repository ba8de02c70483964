//! WebGuard Cloud Server
//!
//! HTTP front door for the URL threat analysis pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WEBGUARD CLOUD                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌──────────────────┐  ┌──────────────────┐ │
//! │  │  API      │  │  Batch           │  │  Callback        │ │
//! │  │  (Axum)   │─▶│  Coordinator     │─▶│  Dispatcher      │ │
//! │  └───────────┘  └────────┬─────────┘  └──────────────────┘ │
//! │                          ▼                                  │
//! │               ┌─────────────────────┐                      │
//! │               │  Analysis Workers   │  fetch → extract →   │
//! │               │  (bounded pool)     │  fuse                │
//! │               └──────────┬──────────┘                      │
//! │                          ▼                                  │
//! │                ┌─────────────┐                             │
//! │                │ PostgreSQL  │  (optional)                 │
//! │                └─────────────┘                             │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod models;
mod handlers;
mod error;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webguard_core::logic::analysis::{
    AnalysisWorker, ArtifactStore, HeuristicExtractor, HttpFetcher, NullArtifactStore,
};
use webguard_core::logic::batch::{spawn_retention_sweeper, BatchCoordinator, JobStore};
use webguard_core::logic::callback::CallbackDispatcher;

pub use error::{AppError, AppResult};

const DEFAULT_LOG_FILTER: &str = "webguard_cloud=debug,webguard_core=info,tower_http=debug";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let json_logs = std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    // Load configuration
    let config = config::Config::from_env().context("invalid configuration")?;

    tracing::info!("WebGuard Cloud Server starting ({})...", config.environment);
    tracing::info!(
        "Fusion weights: text={} anomaly={} rules={}",
        config.weights.text, config.weights.anomaly, config.weights.rules
    );

    // Database is optional; without it artifacts are discarded
    let pool = match &config.database_url {
        Some(url) => {
            tracing::info!("Database: {}", url.split('@').last().unwrap_or("***"));
            let pool = db::create_pool(url).await.context("failed to create database pool")?;

            tracing::info!("Running database migrations...");
            db::run_migrations(&pool).await.context("failed to run migrations")?;
            Some(pool)
        }
        None => {
            if config.is_production() {
                tracing::warn!("Running in production without DATABASE_URL, persistence disabled");
            } else {
                tracing::warn!("DATABASE_URL not set, persistence disabled");
            }
            None
        }
    };

    let artifacts: Arc<dyn ArtifactStore> = match &pool {
        Some(pool) => Arc::new(models::PgArtifactStore::new(pool.clone())),
        None => Arc::new(NullArtifactStore),
    };

    let coordinator = build_coordinator(&config, artifacts)?;

    let _sweeper = spawn_retention_sweeper(
        coordinator.store().clone(),
        config.job_retention(),
        config.job_sweep_interval(),
    );

    // Build application state
    let state = AppState {
        coordinator,
        pool,
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<BatchCoordinator>,
    pub pool: Option<sqlx::PgPool>,
    pub config: config::Config,
}

/// Wire the analysis pipeline from configuration
fn build_coordinator(
    config: &config::Config,
    artifacts: Arc<dyn ArtifactStore>,
) -> anyhow::Result<Arc<BatchCoordinator>> {
    let fetcher = HttpFetcher::new(config.fetch_config()).context("failed to build page fetcher")?;
    let dispatcher = CallbackDispatcher::new(config.callback_config())
        .context("failed to build callback dispatcher")?;

    let worker = AnalysisWorker::new(
        Arc::new(fetcher),
        Arc::new(HeuristicExtractor::new()),
        artifacts,
        Arc::new(config.weights),
    );

    Ok(Arc::new(BatchCoordinator::new(
        Arc::new(JobStore::new()),
        Arc::new(worker),
        Arc::new(dispatcher),
        config.batch_config(),
    )))
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::check))
        // Analysis
        .route("/api/v1/analyze", post(handlers::analyze::single))
        .route("/api/v1/analyze/batch", post(handlers::analyze::batch))
        // Jobs
        .route("/api/v1/jobs/:job_id", get(handlers::jobs::get).delete(handlers::jobs::delete))
        // History
        .route("/api/v1/analyses", get(handlers::analyses::list))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
