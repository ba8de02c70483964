//! Signal Set
//!
//! The three independent detector readings for one URL's analysis attempt,
//! plus the raw evidence behind them. Evidence feeds the verdict's reasons,
//! never the fused score.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// EVIDENCE
// ============================================================================

/// One image referenced by the page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageFlag {
    pub src: String,
    pub is_suspicious: bool,
    pub has_logo: bool,
}

/// Structural properties of the URL itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlFlags {
    pub length: usize,
    pub contains_ip: bool,
    /// Shortener / lookalike patterns the URL matched
    pub suspicious_patterns: Vec<String>,
    pub subdomain_count: usize,
    pub has_at_symbol: bool,
    pub uses_punycode: bool,
    pub hyphen_count: usize,
    pub uses_https: bool,
}

// ============================================================================
// SIGNAL SET
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SignalError {
    #[error("{name} score {value} is outside [0, 1]")]
    OutOfRange { name: &'static str, value: f64 },
}

/// Immutable once built: fields are private, builders consume `self`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalSet {
    url: String,
    text_suspicion_score: f64,
    anomaly_score: f64,
    rule_score: f64,
    matched_patterns: Vec<String>,
    images: Vec<ImageFlag>,
    url_flags: UrlFlags,
}

impl SignalSet {
    pub fn new(url: impl Into<String>, text_suspicion: f64, anomaly: f64, rules: f64) -> Self {
        Self {
            url: url.into(),
            text_suspicion_score: text_suspicion,
            anomaly_score: anomaly,
            rule_score: rules,
            matched_patterns: Vec::new(),
            images: Vec::new(),
            url_flags: UrlFlags::default(),
        }
    }

    /// Add text patterns that matched the page body
    pub fn with_matched_patterns(mut self, patterns: Vec<String>) -> Self {
        self.matched_patterns = patterns;
        self
    }

    /// Add image analysis results
    pub fn with_images(mut self, images: Vec<ImageFlag>) -> Self {
        self.images = images;
        self
    }

    /// Add URL structure flags
    pub fn with_url_flags(mut self, flags: UrlFlags) -> Self {
        self.url_flags = flags;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn text_suspicion_score(&self) -> f64 {
        self.text_suspicion_score
    }

    pub fn anomaly_score(&self) -> f64 {
        self.anomaly_score
    }

    pub fn rule_score(&self) -> f64 {
        self.rule_score
    }

    pub fn matched_patterns(&self) -> &[String] {
        &self.matched_patterns
    }

    pub fn images(&self) -> &[ImageFlag] {
        &self.images
    }

    pub fn url_flags(&self) -> &UrlFlags {
        &self.url_flags
    }

    /// Readings in fusion order: text, anomaly, rules
    pub fn readings(&self) -> [f64; 3] {
        [self.text_suspicion_score, self.anomaly_score, self.rule_score]
    }

    /// Check every reading is a finite value in [0, 1]
    pub fn validate(&self) -> Result<(), SignalError> {
        let named = [
            ("text_suspicion", self.text_suspicion_score),
            ("anomaly", self.anomaly_score),
            ("rule", self.rule_score),
        ];
        for (name, value) in named {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(SignalError::OutOfRange { name, value });
            }
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_builder() {
        let signals = SignalSet::new("http://example.com", 0.1, 0.2, 0.3)
            .with_matched_patterns(vec!["verify your account".to_string()])
            .with_url_flags(UrlFlags {
                contains_ip: true,
                ..Default::default()
            });

        assert_eq!(signals.url(), "http://example.com");
        assert_eq!(signals.readings(), [0.1, 0.2, 0.3]);
        assert_eq!(signals.matched_patterns().len(), 1);
        assert!(signals.url_flags().contains_ip);
        assert!(signals.images().is_empty());
    }

    #[test]
    fn test_validate_range() {
        assert!(SignalSet::new("u", 0.0, 1.0, 0.5).validate().is_ok());

        let err = SignalSet::new("u", 0.0, 1.5, 0.5).validate().unwrap_err();
        assert_eq!(err, SignalError::OutOfRange { name: "anomaly", value: 1.5 });

        assert!(SignalSet::new("u", f64::NAN, 0.0, 0.0).validate().is_err());
        assert!(SignalSet::new("u", 0.0, 0.0, -0.01).validate().is_err());
    }
}
