use arena_judge::JudgeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use crate::metrics;

/// Error body returned by every endpoint on failure.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    Unauthorized(&'static str),
    Judge(JudgeError),
}

impl From<JudgeError> for ApiError {
    fn from(err: JudgeError) -> Self {
        ApiError::Judge(err)
    }
}

impl From<arena_common::StoreError> for ApiError {
    fn from(err: arena_common::StoreError) -> Self {
        ApiError::Judge(JudgeError::Store(err))
    }
}

impl ApiError {
    fn status_and_body(self) -> (StatusCode, ErrorBody) {
        let err = match self {
            ApiError::Unauthorized(message) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    ErrorBody {
                        code: "UNAUTHORIZED",
                        message: message.to_string(),
                    },
                )
            }
            ApiError::Judge(err) => err,
        };

        let (status, code) = match &err {
            JudgeError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            JudgeError::UnsupportedLanguage(_) => (StatusCode::BAD_REQUEST, "UNSUPPORTED_LANGUAGE"),
            JudgeError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            JudgeError::GatewayUnavailable(_) => (StatusCode::BAD_GATEWAY, "GATEWAY_UNAVAILABLE"),
            JudgeError::GatewayTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "GATEWAY_TIMEOUT"),
            JudgeError::Store(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        if err.is_client_error() {
            metrics::record_rejected(err.kind());
        } else if matches!(
            err,
            JudgeError::GatewayUnavailable(_) | JudgeError::GatewayTimeout { .. }
        ) {
            metrics::record_gateway_failure(err.kind());
        }

        let message = match &err {
            JudgeError::Store(inner) => {
                tracing::error!(error = %inner, "Store failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, ErrorBody { code, message })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        (status, Json(body)).into_response()
    }
}
