//! Database module - PostgreSQL connection and migrations

use sqlx::{postgres::PgPoolOptions, PgPool};

/// Create database connection pool
pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // Postgres prepared statements take one command each
    for statement in SCHEMA_SQL.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        sqlx::query(statement).execute(pool).await?;
    }

    tracing::info!("Database schema applied successfully");
    Ok(())
}

/// Database schema SQL
const SCHEMA_SQL: &str = r#"
-- Every persisted artifact: raw pages, features, verdicts, batch results
CREATE TABLE IF NOT EXISTS analysis_artifacts (
    id BIGSERIAL PRIMARY KEY,
    kind VARCHAR(32) NOT NULL,
    artifact_key TEXT NOT NULL,
    payload JSONB NOT NULL,
    threat_level VARCHAR(16),
    score DOUBLE PRECISION,
    created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_artifacts_kind_created ON analysis_artifacts(kind, created_at DESC);
CREATE INDEX IF NOT EXISTS idx_artifacts_key ON analysis_artifacts(artifact_key);
CREATE INDEX IF NOT EXISTS idx_artifacts_level ON analysis_artifacts(threat_level) WHERE threat_level IS NOT NULL;
"#;
