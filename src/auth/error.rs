// Authentication error types

use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::warn;

use crate::error::ApiError;

/// Failures while establishing who is calling
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing authentication token")]
    MissingToken,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,
}

impl From<AuthError> for ApiError {
    fn from(error: AuthError) -> Self {
        warn!("Authentication failed: {}", error);
        ApiError::Unauthenticated(error.to_string())
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}
