//! Error types for blob storage operations

use thiserror::Error;

/// Result type for blob storage operations
pub type BlobStorageResult<T> = Result<T, BlobStorageError>;

/// Errors that can occur while talking to the blob service
#[derive(Error, Debug)]
pub enum BlobStorageError {
    /// The connection string is missing required settings or is malformed
    #[error("Invalid connection string: {0}")]
    InvalidConnectionString(String),

    /// A container or blob name failed validation
    #[error("Invalid name: {0}")]
    InvalidName(String),

    /// The service could not be reached, timed out or answered with a 5xx
    #[error("Blob service unavailable: {0}")]
    Unavailable(String),

    /// The service refused the request with a 4xx status
    #[error("Blob service rejected request with status {status}: {code}")]
    Rejected {
        /// HTTP status returned by the service
        status: u16,
        /// Value of the `x-ms-error-code` header, if any
        code: String,
    },

    /// The service answered with a body that could not be decoded
    #[error("Invalid response from blob service: {0}")]
    InvalidResponse(String),

    /// A request or a SAS could not be signed
    #[error("Signing error: {0}")]
    Signing(String),
}

impl From<reqwest::Error> for BlobStorageError {
    fn from(error: reqwest::Error) -> Self {
        // Connect failures, timeouts and truncated bodies all surface as unavailability
        Self::Unavailable(error.to_string())
    }
}

impl From<quick_xml::Error> for BlobStorageError {
    fn from(error: quick_xml::Error) -> Self {
        Self::InvalidResponse(error.to_string())
    }
}

impl From<quick_xml::SeError> for BlobStorageError {
    fn from(error: quick_xml::SeError) -> Self {
        Self::InvalidResponse(format!("failed to encode request body: {error}"))
    }
}
