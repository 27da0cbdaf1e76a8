//! Configuration validation

use crate::schema::RawConfig;
use rollcall_api::AttendanceStatus;
use thiserror::Error;
use url::Url;

/// Validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Geofence radius must be a positive number of meters, got {0}")]
    InvalidRadius(f64),

    #[error("Location timeout must be at least one second")]
    InvalidTimeout,

    #[error("Invalid API base URL '{0}': expected http:// or https://")]
    InvalidBaseUrl(String),

    #[error("Invalid submission status: {0}")]
    InvalidStatus(String),
}

/// Validate a raw configuration, collecting every problem found
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(radius) = config.geofence.radius_meters
        && !(radius.is_finite() && radius > 0.0)
    {
        errors.push(ValidationError::InvalidRadius(radius));
    }

    if config.location.timeout_seconds == Some(0) {
        errors.push(ValidationError::InvalidTimeout);
    }

    if let Some(url) = &config.service.api_base_url
        && let Err(e) = validate_base_url(url)
    {
        errors.push(e);
    }

    if let Some(status) = &config.submission.status
        && let Err(message) = status.parse::<AttendanceStatus>()
    {
        errors.push(ValidationError::InvalidStatus(message));
    }

    errors
}

/// Check that a base URL is an absolute http(s) URL with a host
pub fn validate_base_url(url: &str) -> Result<(), ValidationError> {
    match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => Ok(()),
        _ => Err(ValidationError::InvalidBaseUrl(url.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(toml_str: &str) -> RawConfig {
        toml::from_str(toml_str).unwrap()
    }

    #[test]
    fn test_valid_config_has_no_errors() {
        let config = raw(r#"
            config_version = 1
            [geofence]
            radius_meters = 50.0
        "#);
        assert!(validate_config(&config).is_empty());
    }

    #[test]
    fn test_radius_validation() {
        for bad in ["0.0", "-5.0", "nan", "inf"] {
            let config = raw(&format!("config_version = 1\n[geofence]\nradius_meters = {}", bad));
            let errors = validate_config(&config);
            assert!(
                errors.iter().any(|e| matches!(e, ValidationError::InvalidRadius(_))),
                "radius {} should be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_base_url_validation() {
        assert!(validate_base_url("http://localhost:3000").is_ok());
        assert!(validate_base_url("https://attendance.example.edu").is_ok());
        assert!(validate_base_url("localhost:3000").is_err());
        assert!(validate_base_url("http://").is_err());
        assert!(validate_base_url("").is_err());
    }

    #[test]
    fn test_malformed_base_urls_rejected() {
        for bad in ["http://exa mple.com", "https://:::", "http://[bad", "ftp://example.edu", "mailto:a@b.c"] {
            assert!(validate_base_url(bad).is_err(), "{} should be rejected", bad);
        }
        assert!(validate_base_url("http://127.0.0.1:8080/api").is_ok());
    }

    #[test]
    fn test_status_validation() {
        let config = raw("config_version = 1\n[submission]\nstatus = \"tardy\"");
        let errors = validate_config(&config);
        assert!(matches!(errors.as_slice(), [ValidationError::InvalidStatus(_)]));
    }
}
