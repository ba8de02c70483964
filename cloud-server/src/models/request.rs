//! Request and response bodies

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidateUrl, ValidationError};

use webguard_core::logic::batch::JobId;

#[derive(Debug, Deserialize, Validate)]
pub struct AnalyzeRequest {
    #[validate(url)]
    pub url: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct BatchAnalyzeRequest {
    #[validate(length(min = 1), custom(function = "validate_url_list"))]
    pub urls: Vec<String>,
    #[validate(url)]
    pub callback_url: Option<String>,
    /// Values above the coordinator's ceiling are clamped, not rejected
    #[validate(range(min = 1))]
    pub concurrency_limit: Option<usize>,
}

fn validate_url_list(urls: &[String]) -> Result<(), ValidationError> {
    if urls.iter().all(|u| u.validate_url()) {
        Ok(())
    } else {
        Err(ValidationError::new("url"))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchAccepted {
    pub job_id: JobId,
    pub status: String,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_url_validation() {
        assert!(AnalyzeRequest { url: "https://example.com/login".to_string() }.validate().is_ok());
        assert!(AnalyzeRequest { url: "definitely not a url".to_string() }.validate().is_err());
    }

    #[test]
    fn test_batch_validation() {
        let ok = BatchAnalyzeRequest {
            urls: vec!["http://a.test/".to_string(), "https://b.test/x".to_string()],
            callback_url: Some("http://hooks.test/done".to_string()),
            concurrency_limit: Some(5),
        };
        assert!(ok.validate().is_ok());

        let empty = BatchAnalyzeRequest { urls: vec![], callback_url: None, concurrency_limit: None };
        assert!(empty.validate().is_err());

        let bad_member = BatchAnalyzeRequest {
            urls: vec!["http://a.test/".to_string(), "nope".to_string()],
            callback_url: None,
            concurrency_limit: None,
        };
        assert!(bad_member.validate().is_err());

        let bad_limit = BatchAnalyzeRequest {
            urls: vec!["http://a.test/".to_string()],
            callback_url: None,
            concurrency_limit: Some(0),
        };
        assert!(bad_limit.validate().is_err());

        let above_default_ceiling = BatchAnalyzeRequest {
            urls: vec!["http://a.test/".to_string()],
            callback_url: None,
            concurrency_limit: Some(100),
        };
        assert!(above_default_ceiling.validate().is_ok());
    }
}
