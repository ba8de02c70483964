//! Analysis artifact model

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use validator::{Validate, ValidationError};

use webguard_core::logic::analysis::{ArtifactKind, ArtifactStore, StoreError};
use webguard_core::logic::threat::ThreatLevel;

const DEFAULT_LIST_LIMIT: i64 = 50;

const LIST_QUERY: &str = r#"
    SELECT id, kind, artifact_key, threat_level, score, payload, created_at
    FROM analysis_artifacts
    WHERE kind = $1
      AND ($2::text IS NULL OR threat_level = $2)
      AND ($3::timestamptz IS NULL OR created_at >= $3)
      AND ($4::timestamptz IS NULL OR created_at <= $4)
    ORDER BY created_at DESC
    LIMIT $5
"#;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnalysisRecord {
    pub id: i64,
    pub kind: String,
    pub artifact_key: String,
    pub threat_level: Option<String>,
    pub score: Option<f64>,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Query for stored verdicts; `since` and `until` are both inclusive
#[derive(Debug, Deserialize, Default, Validate)]
pub struct AnalysisFilter {
    #[validate(custom(function = "validate_threat_level"))]
    pub threat_level: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 1000))]
    pub limit: Option<i64>,
}

fn validate_threat_level(level: &str) -> Result<(), ValidationError> {
    ThreatLevel::parse(level)
        .map(|_| ())
        .ok_or_else(|| ValidationError::new("threat_level"))
}

impl AnalysisRecord {
    /// Stored verdicts, newest first
    pub async fn list(pool: &PgPool, filter: &AnalysisFilter) -> Result<Vec<Self>, sqlx::Error> {
        let level = filter
            .threat_level
            .as_deref()
            .and_then(ThreatLevel::parse)
            .map(|l| l.as_str().to_string());

        sqlx::query_as::<_, AnalysisRecord>(LIST_QUERY)
            .bind(ArtifactKind::Analysis.as_str())
            .bind(level)
            .bind(filter.since)
            .bind(filter.until)
            .bind(filter.limit.unwrap_or(DEFAULT_LIST_LIMIT))
            .fetch_all(pool)
            .await
    }
}

/// Level and score columns, filled only for verdict artifacts
pub fn verdict_columns(kind: ArtifactKind, payload: &serde_json::Value) -> (Option<String>, Option<f64>) {
    if kind != ArtifactKind::Analysis {
        return (None, None);
    }
    (
        payload.get("level").and_then(|v| v.as_str()).map(str::to_string),
        payload.get("score").and_then(|v| v.as_f64()),
    )
}

// ============================================================================
// ARTIFACT STORE
// ============================================================================

/// PostgreSQL-backed artifact sink
#[derive(Clone)]
pub struct PgArtifactStore {
    pool: PgPool,
}

impl PgArtifactStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ArtifactStore for PgArtifactStore {
    async fn persist(&self, kind: ArtifactKind, key: &str, payload: serde_json::Value) -> Result<(), StoreError> {
        let (threat_level, score) = verdict_columns(kind, &payload);

        sqlx::query(
            r#"
            INSERT INTO analysis_artifacts (kind, artifact_key, payload, threat_level, score)
            VALUES ($1, $2, $3, $4, $5)
            "#
        )
        .bind(kind.as_str())
        .bind(key)
        .bind(&payload)
        .bind(threat_level)
        .bind(score)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Backend(e.to_string()))?;

        tracing::trace!(kind = kind.as_str(), key, "artifact stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_verdict_columns_only_for_verdicts() {
        let payload = json!({"url": "http://a", "score": 0.54, "level": "HIGH"});
        assert_eq!(
            verdict_columns(ArtifactKind::Analysis, &payload),
            (Some("HIGH".to_string()), Some(0.54))
        );
        assert_eq!(verdict_columns(ArtifactKind::Features, &payload), (None, None));
    }

    #[test]
    fn test_date_window_is_inclusive() {
        assert!(LIST_QUERY.contains("created_at >= $3"));
        assert!(LIST_QUERY.contains("created_at <= $4"));
    }

    #[test]
    fn test_filter_validation() {
        let ok = AnalysisFilter {
            threat_level: Some("critical".to_string()),
            limit: Some(10),
            ..Default::default()
        };
        assert!(ok.validate().is_ok());

        let bad_level = AnalysisFilter {
            threat_level: Some("apocalyptic".to_string()),
            ..Default::default()
        };
        assert!(bad_level.validate().is_err());

        let bad_limit = AnalysisFilter {
            limit: Some(0),
            ..Default::default()
        };
        assert!(bad_limit.validate().is_err());
    }
}
