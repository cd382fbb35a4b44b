// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Google account not connected")]
    NotConnected,

    #[error("Google account disconnected")]
    Disconnected,

    #[error("Google Tasks is not enabled for this account")]
    FeatureDisabled,

    #[error("OAuth state mismatch")]
    StateMismatch,

    #[error("Access token expired and no refresh token is available")]
    RefreshUnavailable,

    #[error("Google API error: {0}")]
    Provider(String),

    #[error("Task update failed: {0}")]
    UpdateFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

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
            AppError::InvalidToken => (StatusCode::UNAUTHORIZED, "invalid_token", None),
            AppError::NotConnected => (
                StatusCode::CONFLICT,
                "not_connected",
                Some("Connect your Google account first".to_string()),
            ),
            AppError::Disconnected => (
                StatusCode::CONFLICT,
                "disconnected",
                Some("Connect your Google account first".to_string()),
            ),
            AppError::FeatureDisabled => (
                StatusCode::CONFLICT,
                "feature_disabled",
                Some("Enable Google Tasks in your integration settings".to_string()),
            ),
            AppError::StateMismatch => {
                // Potential forgery attempt; keep the response generic.
                tracing::warn!("OAuth callback state mismatch");
                (
                    StatusCode::BAD_REQUEST,
                    "oauth_state_mismatch",
                    Some("Authorization failed, please try again".to_string()),
                )
            }
            AppError::RefreshUnavailable => (
                StatusCode::UNAUTHORIZED,
                "reconnect_required",
                Some("Reconnect your Google account".to_string()),
            ),
            AppError::Provider(msg) => (StatusCode::BAD_GATEWAY, "google_error", Some(msg.clone())),
            AppError::UpdateFailed(msg) => {
                (StatusCode::BAD_GATEWAY, "update_failed", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
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
