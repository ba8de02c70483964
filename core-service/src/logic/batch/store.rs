//! Job Store
//!
//! Concurrent-safe registry of batch jobs. The map lock is held only long
//! enough to find a job; each job then has its own mutex, so workers
//! reporting into different jobs never wait on each other.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use super::error::BatchError;
use super::types::{Job, JobId, JobState};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub pending: usize,
    pub running: usize,
    pub completed: usize,
}

#[derive(Default)]
pub struct JobStore {
    jobs: RwLock<HashMap<JobId, Arc<Mutex<Job>>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, job: Job) -> Result<(), BatchError> {
        let mut jobs = self.jobs.write();
        if jobs.contains_key(&job.job_id) {
            return Err(BatchError::DuplicateJob(job.job_id));
        }
        jobs.insert(job.job_id.clone(), Arc::new(Mutex::new(job)));
        Ok(())
    }

    /// Consistent copy of the job at this instant
    pub fn get(&self, job_id: &JobId) -> Result<Job, BatchError> {
        let entry = self.entry(job_id)?;
        let job = entry.lock().clone();
        Ok(job)
    }

    /// Run `f` with exclusive access to one job
    pub fn update<R>(&self, job_id: &JobId, f: impl FnOnce(&mut Job) -> R) -> Result<R, BatchError> {
        let entry = self.entry(job_id)?;
        let mut job = entry.lock();
        Ok(f(&mut job))
    }

    pub fn remove(&self, job_id: &JobId) -> Result<Job, BatchError> {
        let entry = self
            .jobs
            .write()
            .remove(job_id)
            .ok_or_else(|| BatchError::NotFound(job_id.clone()))?;
        let job = entry.lock().clone();
        Ok(job)
    }

    /// Drop COMPLETED jobs that finished before `cutoff`. Returns how many went.
    pub fn evict_completed_before(&self, cutoff: DateTime<Utc>) -> usize {
        let mut jobs = self.jobs.write();
        let before = jobs.len();
        jobs.retain(|_, entry| {
            let job = entry.lock();
            !(job.state == JobState::Completed && job.completed_at.map_or(false, |t| t < cutoff))
        });
        before - jobs.len()
    }

    pub fn counts(&self) -> JobCounts {
        let jobs = self.jobs.read();
        let mut counts = JobCounts::default();
        for entry in jobs.values() {
            match entry.lock().state {
                JobState::Pending => counts.pending += 1,
                JobState::Running => counts.running += 1,
                JobState::Completed => counts.completed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.jobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.read().is_empty()
    }

    fn entry(&self, job_id: &JobId) -> Result<Arc<Mutex<Job>>, BatchError> {
        self.jobs
            .read()
            .get(job_id)
            .cloned()
            .ok_or_else(|| BatchError::NotFound(job_id.clone()))
    }
}

// ============================================================================
// TESTS
// ============================================================================
