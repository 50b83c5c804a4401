//! Error taxonomy and HTTP mapping for the read-only queue surface.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("configuration error: {0}")]
    Configuration(#[from] config::ConfigError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid task state in storage: {0}")]
    InvalidState(String),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(err: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, api_error) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ApiError::new("not_found", msg.clone())),
            AppError::Database(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("database_error", err.to_string()),
            ),
            AppError::Migration(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("migration_error", err.to_string()),
            ),
            AppError::Configuration(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("configuration_error", err.to_string()),
            ),
            AppError::Serialization(err) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("serialization_error", err.to_string()),
            ),
            AppError::InvalidState(state) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::new("invalid_state", format!("unrecognized task state: {state}")),
            ),
        };

        let body: ApiResponse<()> = ApiResponse::error(api_error);
        (status, Json(body)).into_response()
    }
}
