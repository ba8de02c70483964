//! Fusion Rules & Thresholds
//!
//! Level thresholds (fixed policy) and detector weights (per deployment).
//! No fusion logic here, only constants and config.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::types::ThreatLevel;

// ============================================================================
// LEVEL THRESHOLDS (policy constants - not configurable)
// ============================================================================

/// At or above this score = MEDIUM
pub const MEDIUM_THRESHOLD: f64 = 0.2;

/// At or above this score = HIGH
pub const HIGH_THRESHOLD: f64 = 0.5;

/// At or above this score = CRITICAL
pub const CRITICAL_THRESHOLD: f64 = 0.8;

/// Lower bound (inclusive) of each level, highest first.
/// Anything below the last entry is LOW.
pub const LEVEL_THRESHOLDS: [(f64, ThreatLevel); 3] = [
    (CRITICAL_THRESHOLD, ThreatLevel::Critical),
    (HIGH_THRESHOLD, ThreatLevel::High),
    (MEDIUM_THRESHOLD, ThreatLevel::Medium),
];

/// Decimal places kept for score, confidence and component scores
pub const SCORE_PRECISION: i32 = 4;

// ============================================================================
// DEFAULT WEIGHTS
// ============================================================================

/// Weight of the text-suspicion detector (50%)
pub const TEXT_WEIGHT: f64 = 0.5;

/// Weight of the anomaly detector (30%)
pub const ANOMALY_WEIGHT: f64 = 0.3;

/// Weight of the rule-based detector (20%)
pub const RULES_WEIGHT: f64 = 0.2;

// ============================================================================
// WEIGHT CONFIG
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WeightError {
    #[error("weight '{name}' must be finite and non-negative, got {value}")]
    Invalid { name: &'static str, value: f64 },
    #[error("at least one weight must be positive")]
    AllZero,
}

/// How much each detector contributes to the fused score.
///
/// Shared read-only across every fusion call of a process. Weights
/// conventionally sum to 1 but this is not required.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightConfig {
    pub text: f64,
    pub anomaly: f64,
    pub rules: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            text: TEXT_WEIGHT,
            anomaly: ANOMALY_WEIGHT,
            rules: RULES_WEIGHT,
        }
    }
}

impl WeightConfig {
    pub fn new(text: f64, anomaly: f64, rules: f64) -> Result<Self, WeightError> {
        let weights = Self { text, anomaly, rules };
        weights.validate()?;
        Ok(weights)
    }

    pub fn validate(&self) -> Result<(), WeightError> {
        for (name, value) in [("text", self.text), ("anomaly", self.anomaly), ("rules", self.rules)] {
            if !value.is_finite() || value < 0.0 {
                return Err(WeightError::Invalid { name, value });
            }
        }
        if self.sum() == 0.0 {
            return Err(WeightError::AllZero);
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.text + self.anomaly + self.rules
    }
}
