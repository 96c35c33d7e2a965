use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::db::error::TagStoreError;
use crate::drive::DriveError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration missing: {0}")]
    ConfigurationMissing(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("Not Found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::ConfigurationMissing(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::InvalidInput(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::BackendUnavailable(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({ "error": error_message }))).into_response()
    }
}

impl From<TagStoreError> for AppError {
    fn from(err: TagStoreError) -> Self {
        match err {
            TagStoreError::NotConfigured => AppError::ConfigurationMissing(err.to_string()),
            TagStoreError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::BackendUnavailable(other.to_string()),
        }
    }
}

impl From<DriveError> for AppError {
    fn from(err: DriveError) -> Self {
        match err {
            DriveError::NotConfigured(_) | DriveError::InvalidCredentials(_) => {
                AppError::ConfigurationMissing(err.to_string())
            }
            DriveError::NotFound(msg) => AppError::NotFound(msg),
            other => AppError::BackendUnavailable(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalServerError(format!("JSON serialization/deserialization error: {err}"))
    }
}
