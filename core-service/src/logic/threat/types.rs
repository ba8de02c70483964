//! Threat Types
//!
//! Core types for threat fusion.
//! No logic here, only data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// THREAT LEVEL
// ============================================================================

/// Categorical threat level derived from the fused score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ThreatLevel {
    /// Detectors agree there is little to worry about
    Low,
    /// Some indicators, worth a look
    Medium,
    /// Likely malicious
    High,
    /// Malicious, act now
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "LOW",
            ThreatLevel::Medium => "MEDIUM",
            ThreatLevel::High => "HIGH",
            ThreatLevel::Critical => "CRITICAL",
        }
    }

    /// Parse from the upper-case wire form, case-insensitive
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "LOW" => Some(ThreatLevel::Low),
            "MEDIUM" => Some(ThreatLevel::Medium),
            "HIGH" => Some(ThreatLevel::High),
            "CRITICAL" => Some(ThreatLevel::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// COMPONENT SCORES
// ============================================================================

/// The three pre-fusion readings, kept verbatim (rounded) for auditing
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ComponentScores {
    pub text: f64,
    pub anomaly: f64,
    pub rules: f64,
}

// ============================================================================
// THREAT VERDICT
// ============================================================================

/// Final per-URL output of the fusion engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatVerdict {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    pub score: f64,
    pub level: ThreatLevel,
    pub confidence: f64,
    pub component_scores: ComponentScores,
    /// Human-readable evidence behind the score
    #[serde(default)]
    pub reasons: Vec<String>,
}
