use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::errors::AttemptError;

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    Forbidden(&'static str),
    BadRequest(String),
    /// Attempt-lifecycle rejection with a stable machine-readable code.
    Rejected { status: StatusCode, code: &'static str, detail: String },
    Internal(String),
}

impl ApiError {
    /// Log the underlying error with context and return an `Internal` variant.
    pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Internal(context.to_string())
    }
}

impl From<AttemptError> for ApiError {
    fn from(err: AttemptError) -> Self {
        let status = match &err {
            AttemptError::TestNotFound
            | AttemptError::StudentProfileNotFound
            | AttemptError::ResultNotFound => StatusCode::NOT_FOUND,
            AttemptError::NotAssigned | AttemptError::NotTestOwner => StatusCode::FORBIDDEN,
            AttemptError::AlreadySubmitted
            | AttemptError::WindowClosed
            | AttemptError::NotYetOpen => StatusCode::CONFLICT,
            AttemptError::UnknownStudents(_) => StatusCode::BAD_REQUEST,
            AttemptError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AttemptError::PersistenceConflict { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AttemptError::Store(store) => {
                return ApiError::internal(store, "Attempt storage failed");
            }
        };
        ApiError::Rejected { status, code: err.code(), detail: err.to_string() }
    }
}

fn respond(status: StatusCode, detail: String, code: Option<&'static str>) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail, code })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let mut response = respond(StatusCode::UNAUTHORIZED, message.to_string(), None);
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Forbidden(message) => {
                respond(StatusCode::FORBIDDEN, message.to_string(), None)
            }
            ApiError::BadRequest(message) => respond(StatusCode::BAD_REQUEST, message, None),
            ApiError::Rejected { status, code, detail } => {
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    tracing::error!(code, error = %detail, "Service unavailable");
                }
                respond(status, detail, Some(code))
            }
            ApiError::Internal(message) => {
                tracing::error!(error = %message, "Internal server error");
                respond(StatusCode::INTERNAL_SERVER_ERROR, message, None)
            }
        }
    }
}
