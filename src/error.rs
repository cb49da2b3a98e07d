// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
///
/// Auth and OTP operations never panic or leak provider internals past this
/// boundary: every failure is one of these variants, and handlers return
/// `crate::error::Result<T>`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("This email is already registered")]
    DuplicateAccount,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("{0} has expired")]
    Expired(String),

    #[error("Invalid verification code")]
    OtpMismatch,

    #[error("Identity provider error: {0}")]
    Provider(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                Some(
                    "Invalid email or password. Please check your credentials and try again."
                        .to_string(),
                ),
            ),
            AppError::DuplicateAccount => (
                StatusCode::CONFLICT,
                "duplicate_account",
                Some("This email is already registered. Please log in instead.".to_string()),
            ),
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::Expired(what) => (
                StatusCode::GONE,
                "expired",
                Some(format!("{} has expired. Please request a new one.", what)),
            ),
            AppError::OtpMismatch => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "otp_mismatch",
                Some("Invalid verification code.".to_string()),
            ),
            AppError::Provider(msg) => {
                tracing::error!(error = %msg, "Identity provider error");
                (StatusCode::BAD_GATEWAY, "provider_error", Some(msg.clone()))
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
