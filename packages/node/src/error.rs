//! Application-level error type returned by handlers.
//!
//! All variants serialise to the [`ErrorResponse`] JSON format and map to the
//! appropriate HTTP status code.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use yads::ResolutionError;
use yads_api::{codes, ErrorResponse, ViolationRecord};

use crate::storage::StorageError;

/// An error that a handler can return; converts directly to an HTTP response.
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest(String),
    /// The request body could not be parsed into the expected shape.
    InvalidJson(String),
    /// The request body names an id that does not exist.
    UnknownReference(String),
    Conflict(String),
    /// Validation failed; every violation is reported.
    Unprocessable {
        message: String,
        violations: Vec<ViolationRecord>,
    },
    Internal(String),
}

impl AppError {
    pub fn not_found(what: &str, id: &str) -> Self {
        AppError::NotFound(format!("{what} {id} not found"))
    }

    pub fn unknown_reference(field: &str, id: &str) -> Self {
        AppError::UnknownReference(format!("{field} refers to unknown id {id}"))
    }

    pub fn unprocessable(message: impl Into<String>, violations: Vec<ViolationRecord>) -> Self {
        AppError::Unprocessable {
            message: message.into(),
            violations,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorResponse::new(codes::NOT_FOUND, msg)),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(codes::INVALID_PARAMETER, msg),
            ),
            AppError::InvalidJson(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(codes::INVALID_JSON, msg),
            ),
            AppError::UnknownReference(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(codes::UNKNOWN_REFERENCE, msg),
            ),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ErrorResponse::new(codes::CONFLICT, msg)),
            AppError::Unprocessable {
                message,
                violations,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::validation(message, violations),
            ),
            AppError::Internal(msg) => {
                tracing::error!("internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new(codes::INTERNAL_ERROR, msg),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

impl From<StorageError> for AppError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound => AppError::NotFound("not found".into()),
            StorageError::Conflict(msg) => AppError::Conflict(msg),
            StorageError::Resolution(e) => e.into(),
            StorageError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// Resolution errors are misconfiguration, never bad input.
impl From<ResolutionError> for AppError {
    fn from(e: ResolutionError) -> Self {
        AppError::Internal(e.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(e: JsonRejection) -> Self {
        AppError::InvalidJson(e.body_text())
    }
}

impl From<QueryRejection> for AppError {
    fn from(e: QueryRejection) -> Self {
        AppError::BadRequest(e.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses() {
        let cases = [
            (AppError::not_found("document", "x"), StatusCode::NOT_FOUND),
            (AppError::unknown_reference("documentType", "x"), StatusCode::BAD_REQUEST),
            (AppError::Conflict("c".into()), StatusCode::CONFLICT),
            (AppError::unprocessable("bad", vec![]), StatusCode::UNPROCESSABLE_ENTITY),
            (
                AppError::from(StorageError::from(ResolutionError::MissingRuleTable)),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (AppError::from(StorageError::NotFound), StatusCode::NOT_FOUND),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
