//! Batch Module - multi-URL jobs
//!
//! # Components
//! - `types.rs`: Job, JobId, per-URL outcomes
//! - `store.rs`: JobStore (per-job locking)
//! - `coordinator.rs`: BatchCoordinator, bounded worker pool, retention sweep
//! - `error.rs`: BatchError

pub mod coordinator;
pub mod error;
pub mod store;
pub mod types;

pub use coordinator::{spawn_retention_sweeper, BatchConfig, BatchCoordinator};
pub use error::BatchError;
pub use store::{JobCounts, JobStore};
pub use types::{
    ErrorRecord, Job, JobId, JobSnapshot, JobState, RecordResult, UrlOutcome, UrlResult, UrlStatus,
};
