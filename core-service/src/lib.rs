//! WebGuard Core
//!
//! Threat fusion engine and batch URL analysis pipeline.

pub mod constants;
pub mod logic;

pub use logic::analysis::{AnalysisError, AnalysisWorker};
pub use logic::batch::{BatchCoordinator, BatchError, Job, JobId, JobState};
pub use logic::threat::{fuse, SignalSet, ThreatLevel, ThreatVerdict, WeightConfig};
