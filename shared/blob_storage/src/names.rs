//! Validated container and blob identifiers

use std::{fmt, sync::LazyLock};

use regex::Regex;

use crate::error::{BlobStorageError, BlobStorageResult};

/// Lowercase letters, digits and single hyphens, starting and ending alphanumeric
static CONTAINER_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9](?:[a-z0-9]|-[a-z0-9])*$").expect("Invalid regex")
});

const CONTAINER_NAME_MIN_LEN: usize = 3;
const CONTAINER_NAME_MAX_LEN: usize = 63;
const BLOB_NAME_MAX_LEN: usize = 1024;

/// Name of a blob container
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContainerName(String);

impl ContainerName {
    /// Validates a container name
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::InvalidName` if the name is not 3-63 characters of
    /// lowercase letters, digits and non-consecutive hyphens
    pub fn parse(name: impl Into<String>) -> BlobStorageResult<Self> {
        let name = name.into();

        if !(CONTAINER_NAME_MIN_LEN..=CONTAINER_NAME_MAX_LEN).contains(&name.len()) {
            return Err(BlobStorageError::InvalidName(format!(
                "container name must be {CONTAINER_NAME_MIN_LEN}-{CONTAINER_NAME_MAX_LEN} characters: {name:?}"
            )));
        }

        if !CONTAINER_NAME_REGEX.is_match(&name) {
            return Err(BlobStorageError::InvalidName(format!(
                "container name may only contain lowercase letters, digits and single hyphens: {name:?}"
            )));
        }

        Ok(Self(name))
    }

    /// Returns the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContainerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Name of a blob inside a container
///
/// Names may contain `/` to form virtual directories, but every segment must be
/// non-empty and must not be `.` or `..`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobName(String);

impl BlobName {
    /// Validates a blob name
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::InvalidName` if the name is empty, too long, contains
    /// control characters or has an empty, `.` or `..` path segment
    pub fn parse(name: impl Into<String>) -> BlobStorageResult<Self> {
        let name = name.into();

        if name.is_empty() {
            return Err(BlobStorageError::InvalidName(
                "blob name must not be empty".to_string(),
            ));
        }

        if name.chars().count() > BLOB_NAME_MAX_LEN {
            return Err(BlobStorageError::InvalidName(format!(
                "blob name must be at most {BLOB_NAME_MAX_LEN} characters"
            )));
        }

        if name.chars().any(char::is_control) {
            return Err(BlobStorageError::InvalidName(format!(
                "blob name must not contain control characters: {name:?}"
            )));
        }

        if name.ends_with('.') {
            return Err(BlobStorageError::InvalidName(format!(
                "blob name must not end with a dot: {name:?}"
            )));
        }

        if name
            .split('/')
            .any(|segment| segment.is_empty() || segment == "." || segment == "..")
        {
            return Err(BlobStorageError::InvalidName(format!(
                "blob name has an empty or relative path segment: {name:?}"
            )));
        }

        Ok(Self(name))
    }

    /// Wraps a name reported by the service without validating it
    ///
    /// The service accepts names that `parse` refuses, such as `scans/` or `a//b`.
    /// A listing must return them as they are.
    #[must_use]
    pub fn from_listing(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the name as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments of the name, split on `/`
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }
}

impl fmt::Display for BlobName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
