//! Threat Module
//!
//! Fuses the text, anomaly and rule detectors into one verdict.
//! This is the CORE STEP - where LOW/MEDIUM/HIGH/CRITICAL is decided.
//!
//! ## Structure
//! - `types`: Core types (ThreatLevel, ComponentScores, ThreatVerdict)
//! - `signals`: Per-URL detector readings and evidence
//! - `rules`: Thresholds, weights and constants
//! - `fusion`: Fusion logic
//!
//! ## Usage
//! ```ignore
//! use webguard_core::logic::threat::{fuse, SignalSet, WeightConfig};
//!
//! let verdict = fuse(&signals, &WeightConfig::default());
//! match verdict.level {
//!     ThreatLevel::Low => println!("Safe"),
//!     ThreatLevel::Medium | ThreatLevel::High => println!("Review"),
//!     ThreatLevel::Critical => println!("Block"),
//! }
//! ```

pub mod types;
pub mod signals;
pub mod rules;
pub mod fusion;

// Re-export main types for convenience
pub use types::{
    ThreatLevel,
    ComponentScores,
    ThreatVerdict,
};

pub use signals::{SignalSet, SignalError, ImageFlag, UrlFlags};

pub use rules::{
    WeightConfig,
    WeightError,
    LEVEL_THRESHOLDS,
    SCORE_PRECISION,
};

pub use fusion::{fuse, fuse_at, level_for_score, calculate_confidence, round_score};
