//! Blob storage client for the patient records service
//!
//! This crate speaks the blob service REST protocol directly: Shared Key request
//! signing, container listing, stored access policies and service SAS minting.
//! It works against the cloud service and the local storage emulator alike.

pub mod connection_string;
pub mod container;
pub mod credential;
pub mod error;
pub mod names;
pub mod policy;
pub mod sas;

pub use connection_string::ConnectionString;
pub use container::{BlobItem, ContainerClient};
pub use credential::SharedKeyCredential;
pub use error::{BlobStorageError, BlobStorageResult};
pub use names::{BlobName, ContainerName};
pub use policy::{AccessPermissions, AccessPolicy, SignedIdentifier};
pub use sas::{SasToken, StoredPolicySas};
