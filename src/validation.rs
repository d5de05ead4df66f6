// Validation utilities module
// Provides custom validation functions for domain-specific rules

use validator::ValidationError;

/// Validates that a string is not blank once trimmed
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("must_not_be_blank"))
    } else {
        Ok(())
    }
}

/// Validates that a URL is present and uses http:// or https://
pub fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::new("url_required"));
    }
    if is_http_url(url) {
        Ok(())
    } else {
        Err(ValidationError::new("url_must_be_http"))
    }
}

/// True when `url` starts with `http://` or `https://` (case-sensitive, like the QR links)
pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Trims an optional text field, turning blank input into `None`
pub fn trim_to_option(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
