//! API error types with HTTP response mapping.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use propagation::ProducerError;
use read_model::ReadStoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Producer error.
    Producer(ProducerError),
    /// Read store error.
    Search(ReadStoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body(msg)),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, error_body(msg)),
            ApiError::Producer(err) => producer_error_to_response(err),
            ApiError::Search(err) => {
                let status = if err.is_transient() {
                    StatusCode::SERVICE_UNAVAILABLE
                } else {
                    StatusCode::INTERNAL_SERVER_ERROR
                };
                tracing::error!(error = %err, "search failed");
                (status, error_body(err.to_string()))
            }
        };

        (status, axum::Json(body)).into_response()
    }
}

fn error_body(message: String) -> serde_json::Value {
    serde_json::json!({ "error": message })
}

fn producer_error_to_response(err: ProducerError) -> (StatusCode, serde_json::Value) {
    match &err {
        ProducerError::Validation(_) => (StatusCode::BAD_REQUEST, error_body(err.to_string())),
        ProducerError::NotFound(_) => (StatusCode::NOT_FOUND, error_body(err.to_string())),
        ProducerError::Persistence(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, error_body(err.to_string()))
        }
        ProducerError::PropagationGap { customer_id, .. } => (
            StatusCode::BAD_GATEWAY,
            serde_json::json!({
                "error": err.to_string(),
                "customer_id": customer_id.to_string(),
            }),
        ),
    }
}

impl From<ProducerError> for ApiError {
    fn from(err: ProducerError) -> Self {
        ApiError::Producer(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<ReadStoreError> for ApiError {
    fn from(err: ReadStoreError) -> Self {
        ApiError::Search(err)
    }
}
