//! Universal error handling for the API

use aide::OperationOutput;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use blob_storage::BlobStorageError;
use schemars::JsonSchema;
use serde::Serialize;

use crate::record_service::RecordError;

/// API error response envelope
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    /// Whether the client should retry the request
    pub allow_retry: bool,
    /// Error details
    error: ErrorBody,
}

/// Error body containing code and message
#[derive(Debug, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    /// Machine-readable error code
    pub code: &'static str,
    /// Human-readable error message
    pub message: &'static str,
}

/// Application error type that wraps the API error response
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    inner: ApiErrorResponse,
}

impl AppError {
    /// Create a new application error
    #[must_use]
    pub const fn new(
        status: StatusCode,
        code: &'static str,
        msg: &'static str,
        retry: bool,
    ) -> Self {
        Self {
            status,
            inner: ApiErrorResponse {
                allow_retry: retry,
                error: ErrorBody { code, message: msg },
            },
        }
    }

    /// HTTP status of the error
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the error based on status code
        match self.status.as_u16() {
            400..=499 => tracing::warn!(
                "Client error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            500..=599 => tracing::error!(
                "Server error: {} - {}",
                self.inner.error.code,
                self.inner.error.message
            ),
            _ => {}
        }

        (self.status, Json(self.inner)).into_response()
    }
}

/// Convert record service errors to application errors
impl From<RecordError> for AppError {
    #[allow(clippy::cognitive_complexity)]
    fn from(err: RecordError) -> Self {
        match &err {
            RecordError::InvalidName(msg) => {
                tracing::debug!("Invalid blob name: {msg}");
                Self::new(
                    StatusCode::BAD_REQUEST,
                    "invalid_name",
                    "Invalid record name",
                    false,
                )
            }
            RecordError::StorageUnavailable(msg) => {
                tracing::error!("Storage unavailable: {msg}");
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "storage_unavailable",
                    "Storage service temporarily unavailable",
                    true,
                )
            }
            RecordError::StorageRejected(msg) => {
                tracing::error!("Storage error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    true,
                )
            }
            RecordError::SigningFailure(msg) => {
                tracing::error!("Signing failure: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "signing_failure",
                    "Unable to issue a signed URL",
                    false,
                )
            }
            RecordError::ConfigurationInvalid(msg) => {
                tracing::error!("Configuration error: {msg}");
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error",
                    false,
                )
            }
        }
    }
}

/// Convert storage errors raised at the HTTP boundary, such as name validation
impl From<BlobStorageError> for AppError {
    fn from(err: BlobStorageError) -> Self {
        RecordError::from(err).into()
    }
}

impl OperationOutput for AppError {
    type Inner = ApiErrorResponse;

    fn operation_response(
        ctx: &mut aide::generate::GenContext,
        operation: &mut aide::openapi::Operation,
    ) -> Option<aide::openapi::Response> {
        Json::<ApiErrorResponse>::operation_response(ctx, operation)
    }
}
