/// Error types for Reels Service
///
/// Every failure that can reach an HTTP client is an `AppError`. Errors are
/// converted to JSON responses at the actix boundary; internal details are
/// logged there and never echoed back to the client.
use actix_web::{
    error::ResponseError,
    http::{header, StatusCode},
    HttpResponse,
};
use serde::Serialize;
use thiserror::Error;

/// Result type for reels-service operations
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types
#[derive(Debug, Error)]
pub enum AppError {
    /// Input violated a documented constraint (MIME type, length, range...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Upload exceeded the size ceiling for its media kind
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// State transition that was already applied (double like, double block...)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Action targeting the caller themself (self-block, self-follow)
    #[error("Invalid target: {0}")]
    SelfAction(String),

    /// Missing or malformed identity
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Identity is known but not allowed to touch this resource
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Admission control rejected the request
    #[error("Rate limit exceeded, retry in {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// Media storage or other I/O failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON body returned for every error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status: u16,
    #[serde(rename = "type")]
    pub error_type: String,
    pub code: String,
}

impl AppError {
    fn kind(&self) -> (&'static str, &'static str) {
        match self {
            AppError::Validation(_) => ("validation_error", "VALIDATION_ERROR"),
            AppError::PayloadTooLarge(_) => ("validation_error", "PAYLOAD_TOO_LARGE"),
            AppError::NotFound(_) => ("not_found_error", "NOT_FOUND"),
            AppError::Conflict(_) => ("conflict_error", "ALREADY_APPLIED"),
            AppError::SelfAction(_) => ("validation_error", "INVALID_TARGET"),
            AppError::Unauthorized(_) => ("authentication_error", "UNAUTHENTICATED"),
            AppError::Forbidden(_) => ("authorization_error", "FORBIDDEN"),
            AppError::RateLimited { .. } => ("rate_limit_error", "RATE_LIMITED"),
            AppError::Storage(_) => ("server_error", "STORAGE_ERROR"),
            AppError::Internal(_) => ("server_error", "INTERNAL_SERVER_ERROR"),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::PayloadTooLarge(_)
            | AppError::Conflict(_)
            | AppError::SelfAction(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Storage(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let (error_type, code) = self.kind();

        let message = if status.is_server_error() {
            tracing::error!(error = %self, "request failed with internal error");
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error: status
                .canonical_reason()
                .unwrap_or("Error")
                .to_string(),
            message,
            status: status.as_u16(),
            error_type: error_type.to_string(),
            code: code.to_string(),
        };

        let mut builder = HttpResponse::build(status);
        if let AppError::RateLimited { retry_after_secs } = self {
            builder.insert_header((header::RETRY_AFTER, retry_after_secs.to_string()));
        }
        builder.json(body)
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(err: actix_multipart::MultipartError) -> Self {
        AppError::Validation(format!("Malformed multipart body: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(err.to_string())
    }
}
