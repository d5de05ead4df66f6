// Error handling module for the Restostar API
// Provides the crate-wide error taxonomy and HTTP response conversion

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, error, warn};

/// Main error type for the API
/// All services and handlers return Result<T, ApiError>
///
/// Each variant maps to a specific HTTP status code and a stable
/// machine-readable `error_code`.
#[derive(Debug)]
pub enum ApiError {
    /// Request DTO failed `validator` checks
    /// Maps to HTTP 400 Bad Request
    ValidationError(validator::ValidationErrors),

    /// A single field failed a domain rule (bad slug, URL, empty title...)
    /// Maps to HTTP 400 Bad Request
    Validation { field: String, message: String },

    /// Email supplied with a review did not look like an address
    /// Maps to HTTP 400 Bad Request
    InvalidEmail,

    /// Coupon code did not match the accepted code pattern
    /// Maps to HTTP 400 Bad Request
    InvalidCode,

    /// No authenticated identity on the request
    /// Maps to HTTP 401 Unauthorized
    Unauthenticated(String),

    /// Caller is authenticated but does not own the target
    /// Maps to HTTP 403 Forbidden
    Forbidden(String),

    /// Resource not found by ID or key
    /// Maps to HTTP 404 Not Found
    NotFound { resource: String, id: String },

    /// Owner already has a restaurant with this slug
    /// Maps to HTTP 409 Conflict
    SlugConflict { slug: String },

    /// Every sampled public id collided
    /// Maps to HTTP 409 Conflict
    IdGenerationExhausted,

    /// Every sampled coupon code collided
    /// Maps to HTTP 409 Conflict
    CodeGenerationExhausted,

    /// Owner tried to redeem a coupon that is already redeemed
    /// Maps to HTTP 409 Conflict
    AlreadyRedeemed { redeemed_at: Option<DateTime<Utc>> },

    /// External text-generation or email call failed or returned unusable data
    /// Maps to HTTP 502 Bad Gateway
    Upstream(String),

    /// Database operation errors
    /// Maps to HTTP 500 Internal Server Error
    DatabaseError(sqlx::Error),

    /// Internal server errors
    /// Maps to HTTP 500 Internal Server Error
    InternalError(String),
}

/// Consistent error response structure
///
/// Every error body carries a machine-readable `error_code`, a human-readable
/// `message`, optional structured `details` and the time it was produced.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub timestamp: String,
}

impl ErrorResponse {
    fn new(error_code: &str, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.to_string(),
            message: message.into(),
            details: None,
            timestamp: Utc::now().to_rfc3339(),
        }
    }

    fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = self.to_error_response();
        (status, Json(error_response)).into_response()
    }
}

impl ApiError {
    /// Shorthand for a `NotFound` on a named resource
    pub fn not_found(resource: &str, id: impl ToString) -> Self {
        ApiError::NotFound {
            resource: resource.to_string(),
            id: id.to_string(),
        }
    }

    /// Shorthand for a single-field validation failure
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        ApiError::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// Convert ApiError to HTTP status code and ErrorResponse
    ///
    /// Logging level follows severity: expected client errors at debug,
    /// authorization failures and conflicts at warn, infrastructure and
    /// upstream failures at error. 5xx bodies never carry internal detail.
    fn to_error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = self.status_code();
        let body = match self {
            ApiError::ValidationError(errors) => {
                debug!("Validation error: {:?}", errors);
                ErrorResponse::new("VALIDATION_ERROR", "Request validation failed").with_details(
                    serde_json::to_value(errors).unwrap_or(serde_json::json!({})),
                )
            }
            ApiError::Validation { field, message } => {
                debug!("Validation error on {}: {}", field, message);
                ErrorResponse::new("VALIDATION_ERROR", message.clone())
                    .with_details(serde_json::json!({ "field": field }))
            }
            ApiError::InvalidEmail => {
                debug!("Rejected invalid email");
                ErrorResponse::new("INVALID_EMAIL", "Invalid email")
            }
            ApiError::InvalidCode => {
                debug!("Rejected malformed coupon code");
                ErrorResponse::new("INVALID_CODE", "Invalid coupon code")
            }
            ApiError::Unauthenticated(message) => {
                warn!("Unauthenticated request: {}", message);
                ErrorResponse::new("UNAUTHENTICATED", message.clone())
            }
            ApiError::Forbidden(message) => {
                warn!("Forbidden access attempt: {}", message);
                ErrorResponse::new("FORBIDDEN", message.clone())
            }
            ApiError::NotFound { resource, id } => {
                debug!("Resource not found: {} with id {}", resource, id);
                ErrorResponse::new("NOT_FOUND", format!("{} not found", resource))
            }
            ApiError::SlugConflict { slug } => {
                warn!("Slug conflict: {}", slug);
                ErrorResponse::new("SLUG_CONFLICT", "Slug already in use")
                    .with_details(serde_json::json!({ "slug": slug }))
            }
            ApiError::IdGenerationExhausted => {
                warn!("Public id generation exhausted its attempts");
                ErrorResponse::new("ID_GENERATION_EXHAUSTED", "Failed to generate public id")
            }
            ApiError::CodeGenerationExhausted => {
                warn!("Coupon code generation exhausted its attempts");
                ErrorResponse::new("CODE_GENERATION_EXHAUSTED", "Failed to generate coupon code")
            }
            ApiError::AlreadyRedeemed { redeemed_at } => {
                debug!("Coupon already redeemed at {:?}", redeemed_at);
                ErrorResponse::new("ALREADY_REDEEMED", "This coupon has already been redeemed")
                    .with_details(serde_json::json!({ "redeemed_at": redeemed_at }))
            }
            ApiError::Upstream(message) => {
                error!("Upstream error: {}", message);
                ErrorResponse::new("UPSTREAM_ERROR", "An upstream service failed")
            }
            ApiError::DatabaseError(db_error) => {
                error!("Database error: {:?}", db_error);
                ErrorResponse::new("DATABASE_ERROR", "A database error occurred")
            }
            ApiError::InternalError(internal_msg) => {
                error!("Internal error: {}", internal_msg);
                ErrorResponse::new("INTERNAL_ERROR", "An internal server error occurred")
            }
        };
        (status, body)
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::ValidationError(_)
            | ApiError::Validation { .. }
            | ApiError::InvalidEmail
            | ApiError::InvalidCode => StatusCode::BAD_REQUEST,
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::SlugConflict { .. }
            | ApiError::IdGenerationExhausted
            | ApiError::CodeGenerationExhausted
            | ApiError::AlreadyRedeemed { .. } => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::BAD_GATEWAY,
            ApiError::DatabaseError(_) | ApiError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::ValidationError(errors) => write!(f, "Validation failed: {}", errors),
            ApiError::Validation { field, message } => write!(f, "{}: {}", field, message),
            ApiError::InvalidEmail => write!(f, "Invalid email"),
            ApiError::InvalidCode => write!(f, "Invalid coupon code"),
            ApiError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound { resource, id } => write!(f, "{} {} not found", resource, id),
            ApiError::SlugConflict { slug } => write!(f, "Slug already in use: {}", slug),
            ApiError::IdGenerationExhausted => write!(f, "Failed to generate public id"),
            ApiError::CodeGenerationExhausted => write!(f, "Failed to generate coupon code"),
            ApiError::AlreadyRedeemed { .. } => write!(f, "Coupon already redeemed"),
            ApiError::Upstream(msg) => write!(f, "Upstream error: {}", msg),
            ApiError::DatabaseError(e) => write!(f, "Database error: {}", e),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::DatabaseError(e) => Some(e),
            _ => None,
        }
    }
}

/// Convert sqlx errors to ApiError
impl From<sqlx::Error> for ApiError {
    fn from(error: sqlx::Error) -> Self {
        ApiError::DatabaseError(error)
    }
}

/// Convert validator errors to ApiError
impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors)
    }
}

/// Returns the violated constraint name when `error` is a unique violation
pub fn unique_violation(error: &sqlx::Error) -> Option<String> {
    match error {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Some(db_err.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}
