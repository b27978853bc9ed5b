//! Error types for record service operations

use blob_storage::BlobStorageError;
use thiserror::Error;

/// Result type for record service operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Errors that can occur while serving patient records
#[derive(Error, Debug)]
pub enum RecordError {
    /// Storage configuration is missing or malformed
    #[error("Configuration invalid: {0}")]
    ConfigurationInvalid(String),

    /// The blob store could not be reached or timed out
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// The blob store refused the request or answered with garbage
    #[error("Storage rejected request: {0}")]
    StorageRejected(String),

    /// The shared key credential is missing or unusable
    #[error("Signing failure: {0}")]
    SigningFailure(String),

    /// A blob name supplied by the caller failed validation
    #[error("Invalid name: {0}")]
    InvalidName(String),
}

impl From<BlobStorageError> for RecordError {
    fn from(error: BlobStorageError) -> Self {
        match error {
            BlobStorageError::InvalidConnectionString(msg) => Self::ConfigurationInvalid(msg),
            BlobStorageError::InvalidName(msg) => Self::InvalidName(msg),
            BlobStorageError::Unavailable(msg) => Self::StorageUnavailable(msg),
            BlobStorageError::Signing(msg) => Self::SigningFailure(msg),
            err @ (BlobStorageError::Rejected { .. } | BlobStorageError::InvalidResponse(_)) => {
                Self::StorageRejected(err.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_errors_map_onto_taxonomy() {
        assert!(matches!(
            RecordError::from(BlobStorageError::Unavailable("timeout".into())),
            RecordError::StorageUnavailable(_)
        ));
        assert!(matches!(
            RecordError::from(BlobStorageError::InvalidConnectionString("x".into())),
            RecordError::ConfigurationInvalid(_)
        ));
        assert!(matches!(
            RecordError::from(BlobStorageError::Signing("bad key".into())),
            RecordError::SigningFailure(_)
        ));
        assert!(matches!(
            RecordError::from(BlobStorageError::InvalidName("".into())),
            RecordError::InvalidName(_)
        ));

        let rejected = RecordError::from(BlobStorageError::Rejected {
            status: 403,
            code: "AuthenticationFailed".into(),
        });
        match rejected {
            RecordError::StorageRejected(msg) => assert!(msg.contains("AuthenticationFailed")),
            other => panic!("expected StorageRejected, got {other:?}"),
        }
    }
}
