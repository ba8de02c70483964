//! Batch job types

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::analysis::{AnalysisError, ErrorKind};
use crate::logic::threat::ThreatVerdict;

// ============================================================================
// JOB ID
// ============================================================================

/// Opaque job identifier. Only uniqueness is promised.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    /// `YYYYMMDDHHMMSS-` followed by 12 random hex chars
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        JobId(format!("{}-{}", Utc::now().format("%Y%m%d%H%M%S"), &suffix[..12]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for JobId {
    fn from(value: String) -> Self {
        JobId(value)
    }
}

impl From<&str> for JobId {
    fn from(value: &str) -> Self {
        JobId(value.to_string())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// STATE & OUTCOMES
// ============================================================================

/// Job lifecycle. There is no failed state: failure is per URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// Created, no worker dispatched yet
    Pending,
    /// At least one worker dispatched
    Running,
    /// Every URL has a terminal result
    Completed,
}

impl JobState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobState::Pending => "pending",
            JobState::Running => "running",
            JobState::Completed => "completed",
        }
    }
}

/// A URL whose analysis failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub url: String,
    pub error_kind: ErrorKind,
    pub message: String,
}

impl ErrorRecord {
    pub fn new(url: impl Into<String>, error_kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error_kind,
            message: message.into(),
        }
    }
}

impl From<&AnalysisError> for ErrorRecord {
    fn from(err: &AnalysisError) -> Self {
        ErrorRecord::new(err.url(), err.kind(), err.to_string())
    }
}

/// Terminal result for one URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UrlOutcome {
    Verdict(ThreatVerdict),
    Error(ErrorRecord),
}

impl UrlOutcome {
    pub fn is_error(&self) -> bool {
        matches!(self, UrlOutcome::Error(_))
    }
}

/// What happened when a worker reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordResult {
    Recorded,
    /// This result was the last one; the job is now COMPLETED
    Completed,
    /// URL already had a result, the new one was dropped
    Duplicate,
    /// URL is not part of the job
    UnknownUrl,
}

// ============================================================================
// JOB
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: JobId,
    pub urls: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub state: JobState,
    pub results: HashMap<String, UrlOutcome>,
    pub callback_url: Option<String>,
}

impl Job {
    /// New PENDING job. Repeated URLs are dropped, first occurrence kept.
    pub fn new(job_id: JobId, urls: Vec<String>, callback_url: Option<String>) -> Self {
        let mut seen = HashSet::new();
        let urls = urls.into_iter().filter(|u| seen.insert(u.clone())).collect();

        Self {
            job_id,
            urls,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            state: JobState::Pending,
            results: HashMap::new(),
            callback_url,
        }
    }

    /// PENDING → RUNNING. Returns false if the job had already left PENDING.
    pub fn mark_running(&mut self) -> bool {
        if self.state != JobState::Pending {
            return false;
        }
        self.state = JobState::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Insert one URL's result and complete the job if it was the last.
    /// Both happen under the same `&mut`, so no reader sees one without the other.
    pub fn record(&mut self, url: &str, outcome: UrlOutcome) -> RecordResult {
        if !self.urls.iter().any(|u| u == url) {
            return RecordResult::UnknownUrl;
        }
        if self.results.contains_key(url) {
            return RecordResult::Duplicate;
        }

        self.mark_running();
        self.results.insert(url.to_string(), outcome);

        if self.results.len() == self.urls.len() {
            self.state = JobState::Completed;
            self.completed_at = Some(Utc::now());
            RecordResult::Completed
        } else {
            RecordResult::Recorded
        }
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }

    /// URLs still waiting for a result, in submission order
    pub fn pending_urls(&self) -> Vec<String> {
        self.urls
            .iter()
            .filter(|u| !self.results.contains_key(*u))
            .cloned()
            .collect()
    }

    pub fn error_count(&self) -> usize {
        self.results.values().filter(|r| r.is_error()).count()
    }

    /// Results in submission order; URLs without a result yet are `pending`
    pub fn ordered_results(&self) -> Vec<UrlResult> {
        self.urls
            .iter()
            .map(|url| match self.results.get(url) {
                Some(UrlOutcome::Verdict(v)) => UrlResult {
                    url: url.clone(),
                    status: UrlStatus::Verdict,
                    verdict: Some(v.clone()),
                    error: None,
                },
                Some(UrlOutcome::Error(e)) => UrlResult {
                    url: url.clone(),
                    status: UrlStatus::Error,
                    verdict: None,
                    error: Some(e.clone()),
                },
                None => UrlResult {
                    url: url.clone(),
                    status: UrlStatus::Pending,
                    verdict: None,
                    error: None,
                },
            })
            .collect()
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            job_id: self.job_id.clone(),
            state: self.state,
            created_at: self.created_at,
            started_at: self.started_at,
            completed_at: self.completed_at,
            callback_url: self.callback_url.clone(),
            total: self.urls.len(),
            completed: self.results.len(),
            failed: self.error_count(),
            results: self.ordered_results(),
        }
    }
}

// ============================================================================
// REPORTING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrlStatus {
    Pending,
    Verdict,
    Error,
}

/// One row of an ordered job report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UrlResult {
    pub url: String,
    pub status: UrlStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<ThreatVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorRecord>,
}

/// Read-only view of a job, results in submission order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub callback_url: Option<String>,
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub results: Vec<UrlResult>,
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::threat::{fuse, SignalSet, WeightConfig};

    fn verdict(url: &str) -> UrlOutcome {
        UrlOutcome::Verdict(fuse(&SignalSet::new(url, 0.1, 0.2, 0.3), &WeightConfig::default()))
    }

    fn error(url: &str) -> UrlOutcome {
        UrlOutcome::Error(ErrorRecord::new(url, ErrorKind::Fetch, "connection refused"))
    }

    fn job(urls: &[&str]) -> Job {
        Job::new(JobId::generate(), urls.iter().map(|u| u.to_string()).collect(), None)
    }

    #[test]
    fn test_job_id_format() {
        let a = JobId::generate();
        let b = JobId::generate();
        assert_ne!(a, b);
        let (stamp, suffix) = a.as_str().split_once('-').unwrap();
        assert_eq!(stamp.len(), 14);
        assert_eq!(suffix.len(), 12);
    }

    #[test]
    fn test_duplicate_urls_are_dropped() {
        let j = job(&["http://a", "http://b", "http://a"]);
        assert_eq!(j.urls, vec!["http://a".to_string(), "http://b".to_string()]);
        assert_eq!(j.state, JobState::Pending);
    }

    #[test]
    fn test_completes_only_when_every_url_reported() {
        let mut j = job(&["http://a", "http://b", "http://c"]);
        assert!(j.mark_running());
        assert!(!j.mark_running());

        assert_eq!(j.record("http://a", verdict("http://a")), RecordResult::Recorded);
        assert_eq!(j.state, JobState::Running);
        assert_eq!(j.record("http://b", error("http://b")), RecordResult::Recorded);
        assert_eq!(j.state, JobState::Running);
        assert!(j.completed_at.is_none());

        assert_eq!(j.record("http://c", verdict("http://c")), RecordResult::Completed);
        assert_eq!(j.state, JobState::Completed);
        assert_eq!(j.results.len(), j.urls.len());
        assert!(j.completed_at.is_some());
        assert_eq!(j.error_count(), 1);
    }

    #[test]
    fn test_results_are_monotonic() {
        let mut j = job(&["http://a", "http://b"]);
        j.record("http://a", error("http://a"));

        assert_eq!(j.record("http://a", verdict("http://a")), RecordResult::Duplicate);
        assert!(j.results["http://a"].is_error());

        assert_eq!(j.record("http://zzz", verdict("http://zzz")), RecordResult::UnknownUrl);
        assert_eq!(j.results.len(), 1);
    }

    #[test]
    fn test_record_on_pending_job_starts_it() {
        let mut j = job(&["http://a", "http://b"]);
        j.record("http://b", verdict("http://b"));
        assert_eq!(j.state, JobState::Running);
        assert!(j.started_at.is_some());
    }

    #[test]
    fn test_ordered_results_follow_submission_order() {
        let mut j = job(&["http://c", "http://a", "http://b"]);
        j.record("http://b", verdict("http://b"));
        j.record("http://c", error("http://c"));

        let rows = j.ordered_results();
        let order: Vec<&str> = rows.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(order, vec!["http://c", "http://a", "http://b"]);
        assert_eq!(rows[0].status, UrlStatus::Error);
        assert_eq!(rows[1].status, UrlStatus::Pending);
        assert_eq!(rows[2].status, UrlStatus::Verdict);

        let snapshot = j.snapshot();
        assert_eq!(snapshot.total, 3);
        assert_eq!(snapshot.completed, 2);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(j.pending_urls(), vec!["http://a".to_string()]);
    }

    #[test]
    fn test_outcome_wire_format() {
        let value = serde_json::to_value(error("http://a")).unwrap();
        assert_eq!(value["outcome"], "error");
        assert_eq!(value["error_kind"], "fetch");

        let value = serde_json::to_value(verdict("http://a")).unwrap();
        assert_eq!(value["outcome"], "verdict");
        assert!(value["score"].is_number());
    }
}
