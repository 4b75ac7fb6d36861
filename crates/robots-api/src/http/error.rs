//! Application error type mapping to HTTP status codes and envelope format.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use robots_types::error::FleetError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Fleet operation errors.
    Fleet(FleetError),
    /// Malformed request.
    Validation(String),
}

impl From<FleetError> for AppError {
    fn from(e: FleetError) -> Self {
        AppError::Fleet(e)
    }
}

impl AppError {
    /// HTTP status and machine-readable code.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Fleet(e) => match e {
                FleetError::NotFound(_) => (StatusCode::NOT_FOUND, "ROBOT_NOT_FOUND"),
                FleetError::AlreadyExists(_) => (StatusCode::CONFLICT, "ROBOT_EXISTS"),
                FleetError::InvalidAspect(_) => (StatusCode::BAD_REQUEST, "INVALID_ASPECT"),
                FleetError::InvalidValue { .. } | FleetError::InvalidName(_) => {
                    (StatusCode::BAD_REQUEST, "VALIDATION_ERROR")
                }
                FleetError::MissingHostname(_) => (StatusCode::BAD_REQUEST, "MISSING_HOSTNAME"),
                FleetError::NoRobots => (StatusCode::NOT_FOUND, "NO_ROBOTS"),
                FleetError::NoMatches => (StatusCode::NOT_FOUND, "NO_MATCHES"),
                FleetError::StorageError(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")
                }
            },
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = match &self {
            AppError::Fleet(e) => e.to_string(),
            AppError::Validation(msg) => msg.clone(),
        };

        if status.is_server_error() {
            tracing::error!(code, %message, "request failed");
        }

        let body = ApiResponse::error(code, &message, uuid::Uuid::now_v7().to_string());
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_results_have_distinct_codes() {
        let (s1, c1) = AppError::from(FleetError::NoRobots).status_and_code();
        let (s2, c2) = AppError::from(FleetError::NoMatches).status_and_code();
        assert_eq!(s1, StatusCode::NOT_FOUND);
        assert_eq!(s2, StatusCode::NOT_FOUND);
        assert_ne!(c1, c2);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (FleetError::NotFound("a".into()), StatusCode::NOT_FOUND),
            (FleetError::AlreadyExists("a".into()), StatusCode::CONFLICT),
            (FleetError::InvalidAspect("x".into()), StatusCode::BAD_REQUEST),
            (FleetError::InvalidName("x".into()), StatusCode::BAD_REQUEST),
            (FleetError::StorageError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(AppError::from(err).status_and_code().0, status);
        }
    }
}
