//! Mapping of service errors onto HTTP responses

use crate::error::ArenaError;
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

/// Error returned by request handlers
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<ArenaError>() {
            Some(ArenaError::NotFound { .. }) | Some(ArenaError::InvalidInput { .. }) => {
                StatusCode::BAD_REQUEST
            }
            Some(ArenaError::InsufficientData { .. }) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(value: anyhow::Error) -> Self {
        Self(value)
    }
}

impl From<ArenaError> for ApiError {
    fn from(value: ArenaError) -> Self {
        Self(value.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ArenaError::invalid(rejection.body_text()).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        // Internal details stay in the logs
        let message = if status.is_server_error() {
            error!("Request failed: {:#}", self.0);
            "internal error".to_string()
        } else {
            self.0.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::from(ArenaError::NotFound { id: 1 }).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ArenaError::invalid("bad")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ArenaError::InsufficientData { available: 0 }).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
