use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// HTTP-facing error. Each variant carries a stable numeric code that clients
/// can branch on regardless of the human-readable message.
///
/// Code ranges: 1xxxx common, 3xxxx catalog, 5xxxx booking.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not Found: {message}")]
    NotFound { code: u32, message: String },

    #[error("Bad Request: {message}")]
    Validation { code: u32, message: String },

    #[error("Conflict: {message}")]
    Conflict { code: u32, message: String },

    #[error("Internal Server Error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    pub fn not_found(code: u32, message: impl Into<String>) -> Self {
        AppError::NotFound { code, message: message.into() }
    }

    pub fn validation(code: u32, message: impl Into<String>) -> Self {
        AppError::Validation { code, message: message.into() }
    }

    pub fn conflict(code: u32, message: impl Into<String>) -> Self {
        AppError::Conflict { code, message: message.into() }
    }

    pub fn code(&self) -> u32 {
        match self {
            AppError::Auth(_) => 10005,
            AppError::NotFound { code, .. }
            | AppError::Validation { code, .. }
            | AppError::Conflict { code, .. } => *code,
            AppError::Internal(_) => 10008,
            AppError::Database(_) => 10001,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::Validation { .. } => StatusCode::BAD_REQUEST,
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        tracing::error!("Error: {}: {}", status, self);

        let body = Json(json!({
            "code": self.code(),
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::not_found(50001, "Booking not found").code(), 50001);
        assert_eq!(AppError::conflict(50002, "taken").code(), 50002);
        assert_eq!(AppError::Database("boom".to_string()).code(), 10001);
        assert_eq!(AppError::Internal("boom".to_string()).code(), 10008);
    }
}
