//! Logic Module - Engines & Pipeline
//!
//! - `threat/` - Fusion engine (signals, weights, verdicts)
//! - `analysis/` - Single URL pipeline (fetch, extract, fuse, persist)
//! - `batch/` - Jobs, JobStore, BatchCoordinator
//! - `callback/` - Completion callbacks with retry

pub mod analysis;
pub mod batch;
pub mod callback;
pub mod threat;
