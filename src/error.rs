//! Error types for the lending server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Stable numeric error codes exposed in response bodies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    NotAuthorized = 3,
    NoSuchBook = 4,
    OutOfInventory = 5,
    NothingToReturn = 6,
    InvalidInventoryChange = 7,
    VersionConflict = 8,
    AlreadyExists = 9,
    BorrowLimitReached = 10,
    BadValue = 11,
    StoreUnavailable = 12,
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No units of {isbn} are available")]
    OutOfInventory { isbn: String },

    #[error("Borrower {borrower} has nothing to return for {isbn}")]
    NothingToReturn { isbn: String, borrower: String },

    #[error("Cannot set total units of {isbn} to {requested}: {checked_out} unit(s) are checked out")]
    InvalidInventoryChange {
        isbn: String,
        requested: u32,
        checked_out: u32,
    },

    #[error("Borrower {borrower} already holds the maximum of {limit} unit(s) of {isbn}")]
    BorrowLimitReached {
        isbn: String,
        borrower: String,
        limit: u32,
    },

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::StoreUnavailable(format!("database: {}", e))
    }
}

impl From<sqlx::migrate::MigrateError> for AppError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        AppError::StoreUnavailable(format!("migration: {}", e))
    }
}

impl From<redis::RedisError> for AppError {
    fn from(e: redis::RedisError) -> Self {
        AppError::StoreUnavailable(format!("redis: {}", e))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::StoreUnavailable(format!("record encoding: {}", e))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(e: validator::ValidationErrors) -> Self {
        AppError::Validation(e.to_string())
    }
}

impl AppError {
    /// HTTP status and error code for this error
    pub fn status_and_code(&self) -> (StatusCode, ErrorCode) {
        match self {
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated),
            AppError::Unauthorized(_) => (StatusCode::FORBIDDEN, ErrorCode::NotAuthorized),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, ErrorCode::NoSuchBook),
            AppError::OutOfInventory { .. } => (StatusCode::CONFLICT, ErrorCode::OutOfInventory),
            AppError::NothingToReturn { .. } => (StatusCode::CONFLICT, ErrorCode::NothingToReturn),
            AppError::InvalidInventoryChange { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InvalidInventoryChange)
            }
            AppError::BorrowLimitReached { .. } => {
                (StatusCode::CONFLICT, ErrorCode::BorrowLimitReached)
            }
            AppError::Conflict(_) => (StatusCode::CONFLICT, ErrorCode::VersionConflict),
            AppError::AlreadyExists(_) => (StatusCode::CONFLICT, ErrorCode::AlreadyExists),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue),
            AppError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, ErrorCode::StoreUnavailable)
            }
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, ErrorCode::Failure),
        }
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        let message = match &self {
            AppError::StoreUnavailable(cause) => {
                tracing::error!("Store error: {}", cause);
                "Catalog store is unavailable".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
