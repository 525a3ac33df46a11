use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ErrorResponse;
use crate::services::{SearchError, SyncError};

/// Public message for any failure of the store or the search index.
pub const SEARCH_FAILED: &str = "Search failed";

pub const SYNC_FAILED: &str = "Sync failed";

#[derive(Debug)]
pub enum ApiError {
    ValidationError(String),

    SearchFailed(String),

    SyncFailed(String),

    ServiceUnavailable(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError(msg) => write!(f, "Validation error: {msg}"),
            Self::SearchFailed(msg) => write!(f, "Search failed: {msg}"),
            Self::SyncFailed(msg) => write!(f, "Sync failed: {msg}"),
            Self::ServiceUnavailable(msg) => write!(f, "Service unavailable: {msg}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            Self::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            Self::SearchFailed(msg) => {
                tracing::error!(event = "search_failed", error = %msg, "Search request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, SEARCH_FAILED.to_string())
            }
            Self::SyncFailed(msg) => {
                tracing::error!(
                    event = "resync_request_failed",
                    error = %msg,
                    "Resync request failed"
                );
                (StatusCode::INTERNAL_SERVER_ERROR, SYNC_FAILED.to_string())
            }
            Self::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, msg.clone()),
        };

        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self::SearchFailed(err.to_string())
    }
}

impl From<SyncError> for ApiError {
    fn from(err: SyncError) -> Self {
        Self::SyncFailed(err.to_string())
    }
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::ValidationError(msg.into())
    }
}
