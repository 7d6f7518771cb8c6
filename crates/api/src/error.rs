//! API error types with HTTP response mapping.

use application::ApplicationError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sale_store::StoreError;

use crate::response::{ApiResponse, ErrorDetail};

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// A use case failed.
    Application(ApplicationError),
    /// The request could not be turned into a command.
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Application(err) => application_error_to_response(err),
            ApiError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                ApiResponse::failure("Bad Request", vec![ErrorDetail::Message(msg)]),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn application_error_to_response(err: ApplicationError) -> (StatusCode, ApiResponse<()>) {
    match err {
        ApplicationError::Validation(errors) => (
            StatusCode::BAD_REQUEST,
            ApiResponse::failure(
                "Validation Failed",
                errors
                    .failures()
                    .iter()
                    .cloned()
                    .map(ErrorDetail::Field)
                    .collect(),
            ),
        ),
        ApplicationError::Domain(err) => (
            StatusCode::BAD_REQUEST,
            ApiResponse::failure("BusinessLogicError", vec![message(&err)]),
        ),
        ApplicationError::NotFound(msg) => (
            StatusCode::NOT_FOUND,
            ApiResponse::failure("NotFoundError", vec![ErrorDetail::Message(msg)]),
        ),
        ApplicationError::Store(err @ StoreError::NotFound(_)) => (
            StatusCode::NOT_FOUND,
            ApiResponse::failure("NotFoundError", vec![message(&err)]),
        ),
        ApplicationError::Store(err @ StoreError::ConcurrencyConflict { .. }) => (
            StatusCode::CONFLICT,
            ApiResponse::failure("ConcurrencyConflict", vec![message(&err)]),
        ),
        ApplicationError::Store(err) => {
            tracing::error!(error = %err, "internal server error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiResponse::failure(
                    "InternalServerError",
                    vec![ErrorDetail::Message(
                        "An unexpected error occurred.".to_string(),
                    )],
                ),
            )
        }
    }
}

fn message(err: &impl std::fmt::Display) -> ErrorDetail {
    ErrorDetail::Message(err.to_string())
}

impl From<ApplicationError> for ApiError {
    fn from(err: ApplicationError) -> Self {
        ApiError::Application(err)
    }
}
