//! Fusion Engine
//!
//! Only the fusion logic lives here - no types, no thresholds.
//! Input: SignalSet + WeightConfig
//! Output: ThreatVerdict

use chrono::{DateTime, Utc};

use super::rules::{WeightConfig, LEVEL_THRESHOLDS, SCORE_PRECISION};
use super::signals::SignalSet;
use super::types::{ComponentScores, ThreatLevel, ThreatVerdict};

// ============================================================================
// MAIN FUSION FUNCTION
// ============================================================================

/// Fuse a signal set into a verdict stamped with the current time.
pub fn fuse(signals: &SignalSet, weights: &WeightConfig) -> ThreatVerdict {
    fuse_at(signals, weights, Utc::now())
}

/// Fusion with an explicit timestamp.
///
/// CORE LOGIC - deterministic and explainable. Never fails: readings that
/// are not finite count as 0 and everything is clamped into [0, 1].
pub fn fuse_at(signals: &SignalSet, weights: &WeightConfig, timestamp: DateTime<Utc>) -> ThreatVerdict {
    let [text, anomaly, rules] = signals.readings().map(sanitize);

    let weighted = weights.text * text + weights.anomaly * anomaly + weights.rules * rules;
    let score = round_score(sanitize(weighted));
    let level = level_for_score(score);
    let confidence = round_score(calculate_confidence(&[text, anomaly, rules]));

    let mut reasons = collect_reasons(signals);
    reasons.push(format!(
        "Final score: {:.4}, level: {}, confidence: {:.4}",
        score, level, confidence
    ));

    ThreatVerdict {
        url: signals.url().to_string(),
        timestamp,
        score,
        level,
        confidence,
        component_scores: ComponentScores {
            text: round_score(text),
            anomaly: round_score(anomaly),
            rules: round_score(rules),
        },
        reasons,
    }
}

// ============================================================================
// BUILDING BLOCKS
// ============================================================================

/// Map a fused score onto its level. Lower bounds are inclusive.
pub fn level_for_score(score: f64) -> ThreatLevel {
    LEVEL_THRESHOLDS
        .iter()
        .find(|(lower, _)| score >= *lower)
        .map(|(_, level)| *level)
        .unwrap_or(ThreatLevel::Low)
}

/// Agreement between detectors: 1 - stddev/mean of the component readings.
///
/// All-zero readings mean the detectors unanimously see no threat, so the
/// confidence is exactly 1.0 there instead of dividing by zero.
pub fn calculate_confidence(readings: &[f64]) -> f64 {
    if readings.is_empty() {
        return 1.0;
    }

    let n = readings.len() as f64;
    let mean = readings.iter().sum::<f64>() / n;
    if mean == 0.0 {
        return 1.0;
    }

    let variance = readings.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    (1.0 - variance.sqrt() / mean).clamp(0.0, 1.0)
}

/// Round to `SCORE_PRECISION` decimal places
pub fn round_score(value: f64) -> f64 {
    let factor = 10f64.powi(SCORE_PRECISION);
    (value * factor).round() / factor
}

fn sanitize(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn collect_reasons(signals: &SignalSet) -> Vec<String> {
    let mut reasons = Vec::new();

    for pattern in signals.matched_patterns() {
        reasons.push(format!("Suspicious text: \"{}\"", pattern));
    }

    for image in signals.images() {
        if image.is_suspicious {
            reasons.push(format!("Suspicious image: {}", image.src));
        }
        if image.has_logo {
            reasons.push(format!("Brand logo image: {}", image.src));
        }
    }

    let flags = signals.url_flags();
    if flags.contains_ip {
        reasons.push("URL host is an IP address".to_string());
    }
    for pattern in &flags.suspicious_patterns {
        reasons.push(format!("URL matches suspicious pattern {}", pattern));
    }
    if flags.subdomain_count > 2 {
        reasons.push(format!("{} subdomains in host", flags.subdomain_count));
    }
    if flags.has_at_symbol {
        reasons.push("URL contains '@'".to_string());
    }
    if flags.uses_punycode {
        reasons.push("Punycode host".to_string());
    }

    reasons
}

// ============================================================================
// TESTS
// ============================================================================
