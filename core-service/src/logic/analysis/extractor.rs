//! Heuristic signal extractor
//!
//! Rule-based stand-in for the ML feature extractor: phishing phrase
//! matching for the text signal, URL structure for the anomaly signal and
//! additive rules for the rule signal. No models involved.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};

use super::collaborators::SignalExtractor;
use super::error::ExtractionError;
use crate::logic::threat::{ImageFlag, SignalSet, UrlFlags};

// ============================================================================
// PATTERNS
// ============================================================================

const PHISHING_PATTERNS: &[&str] = &[
    r"verify.{0,40}account",
    r"confirm.{0,40}password",
    r"security.{0,40}update",
    r"login.{0,40}expired",
    r"account.{0,40}suspended",
    r"unusual.{0,40}sign.?in",
    r"update.{0,40}payment",
];

const SHORTENER_PATTERNS: &[&str] = &[
    r"bit\.ly",
    r"tiny\.cc",
    r"tinyurl\.com",
    r"goo\.gl",
    r"ow\.ly",
];

static PHISHING_RES: Lazy<Vec<Regex>> = Lazy::new(|| compile_all(PHISHING_PATTERNS));
static SHORTENER_RES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SHORTENER_PATTERNS.iter().copied().zip(compile_all(SHORTENER_PATTERNS)).collect()
});
static IP_RE: Lazy<Regex> = Lazy::new(|| compile(r"\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3}"));
static IMG_RE: Lazy<Regex> = Lazy::new(|| compile(r#"<img[^>]+src=["']([^"'>]+)["']"#));
static PASSWORD_RE: Lazy<Regex> = Lazy::new(|| compile(r#"<input[^>]+type=["']?password"#));

fn compile(pattern: &str) -> Regex {
    // Only called with the built-in constant patterns
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|e| panic!("invalid built-in pattern {}: {}", pattern, e))
}

fn compile_all(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| compile(p)).collect()
}

// ============================================================================
// SCORING CONSTANTS
// ============================================================================

/// Text score added per phishing phrase match
const TEXT_MATCH_WEIGHT: f64 = 0.1;
/// Text score added when the page asks for a password
const PASSWORD_FIELD_WEIGHT: f64 = 0.2;
/// URLs longer than this count as a structural anomaly
const LONG_URL_THRESHOLD: usize = 75;
/// Hyphens in the host beyond this count as a structural anomaly
const HYPHEN_THRESHOLD: usize = 3;
/// Images inspected per page
const MAX_IMAGES: usize = 50;
/// Longest matched snippet kept as evidence
const MAX_SNIPPET_CHARS: usize = 80;

// ============================================================================
// EXTRACTOR
// ============================================================================

#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// Phishing phrases found in the body
    pub fn match_text_patterns(body: &str) -> Vec<String> {
        let mut matches = Vec::new();
        for re in PHISHING_RES.iter() {
            for m in re.find_iter(body) {
                matches.push(m.as_str().chars().take(MAX_SNIPPET_CHARS).collect());
            }
        }
        matches
    }

    pub fn analyze_url(url: &str) -> Result<UrlFlags, ExtractionError> {
        let parsed = reqwest::Url::parse(url).map_err(|e| ExtractionError::InvalidUrl(e.to_string()))?;
        let host = parsed.host_str().unwrap_or("").trim_matches(|c| c == '[' || c == ']');
        let host_is_ip = host.parse::<std::net::IpAddr>().is_ok();

        Ok(UrlFlags {
            length: url.len(),
            contains_ip: host_is_ip || IP_RE.is_match(url),
            suspicious_patterns: SHORTENER_RES
                .iter()
                .filter(|(_, re)| re.is_match(url))
                .map(|(pattern, _)| pattern.to_string())
                .collect(),
            subdomain_count: if host_is_ip {
                0
            } else {
                host.matches('.').count().saturating_sub(1)
            },
            has_at_symbol: url.contains('@'),
            uses_punycode: host.split('.').any(|label| label.starts_with("xn--")),
            hyphen_count: host.matches('-').count(),
            uses_https: parsed.scheme() == "https",
        })
    }

    pub fn analyze_images(body: &str) -> Vec<ImageFlag> {
        IMG_RE
            .captures_iter(body)
            .filter_map(|caps| caps.get(1))
            .take(MAX_IMAGES)
            .map(|src| {
                let src = src.as_str();
                let lower = src.to_ascii_lowercase();
                ImageFlag {
                    src: src.to_string(),
                    is_suspicious: lower.starts_with("data:") || IP_RE.is_match(src),
                    has_logo: lower.contains("logo"),
                }
            })
            .collect()
    }

    pub fn text_score(matches: &[String], has_password_field: bool) -> f64 {
        let mut score = matches.len() as f64 * TEXT_MATCH_WEIGHT;
        if has_password_field {
            score += PASSWORD_FIELD_WEIGHT;
        }
        score.min(1.0)
    }

    /// Fraction of structural URL flags that are raised
    pub fn anomaly_score(flags: &UrlFlags) -> f64 {
        let checks = [
            flags.length > LONG_URL_THRESHOLD,
            flags.contains_ip,
            flags.subdomain_count > 2,
            flags.has_at_symbol,
            flags.uses_punycode,
            flags.hyphen_count > HYPHEN_THRESHOLD,
            !flags.uses_https,
        ];
        checks.iter().filter(|c| **c).count() as f64 / checks.len() as f64
    }

    pub fn rule_score(matches: &[String], flags: &UrlFlags, images: &[ImageFlag]) -> f64 {
        let mut score = 0.0;

        if !matches.is_empty() {
            score += 0.3;
        }
        if flags.contains_ip {
            score += 0.2;
        }
        if !flags.suspicious_patterns.is_empty() {
            score += 0.2;
        }
        if flags.subdomain_count > 2 {
            score += 0.1;
        }
        for image in images {
            if image.is_suspicious {
                score += 0.1;
            }
            if image.has_logo {
                score += 0.1;
            }
        }

        f64::min(score, 1.0)
    }
}

#[async_trait]
impl SignalExtractor for HeuristicExtractor {
    async fn extract(&self, body: &str, url: &str) -> Result<SignalSet, ExtractionError> {
        let flags = Self::analyze_url(url)?;
        let matches = Self::match_text_patterns(body);
        let images = Self::analyze_images(body);
        let has_password_field = PASSWORD_RE.is_match(body);

        let text = Self::text_score(&matches, has_password_field);
        let anomaly = Self::anomaly_score(&flags);
        let rules = Self::rule_score(&matches, &flags, &images);

        let mut evidence = matches;
        if has_password_field {
            evidence.push("password input".to_string());
        }

        Ok(SignalSet::new(url, text, anomaly, rules)
            .with_matched_patterns(evidence)
            .with_images(images)
            .with_url_flags(flags))
    }
}

// ============================================================================
// TESTS
// ============================================================================
