//! Stored access policies and permission sets

use std::fmt;

use chrono::{DateTime, Utc};

/// Permissions granted by an access policy or a SAS
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccessPermissions {
    /// Read content, properties and metadata
    pub read: bool,
    /// Append blocks
    pub add: bool,
    /// Create new blobs
    pub create: bool,
    /// Write content and metadata
    pub write: bool,
    /// Delete blobs
    pub delete: bool,
    /// List blobs
    pub list: bool,
}

impl AccessPermissions {
    /// Read-only permission set (`r`)
    #[must_use]
    pub const fn read_only() -> Self {
        Self {
            read: true,
            add: false,
            create: false,
            write: false,
            delete: false,
            list: false,
        }
    }
}

/// Letters are written in the canonical `racwdl` order
impl fmt::Display for AccessPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letters = [
            (self.read, 'r'),
            (self.add, 'a'),
            (self.create, 'c'),
            (self.write, 'w'),
            (self.delete, 'd'),
            (self.list, 'l'),
        ];
        for (granted, letter) in letters {
            if granted {
                write!(f, "{letter}")?;
            }
        }
        Ok(())
    }
}

/// Permission and expiry of a stored access policy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicy {
    /// End of validity
    pub expires_on: DateTime<Utc>,
    /// Granted permissions
    pub permissions: AccessPermissions,
}

/// A stored access policy registered on a container under an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedIdentifier {
    /// Identifier referenced by SAS tokens through the `si` parameter
    pub id: String,
    /// The policy itself
    pub access_policy: AccessPolicy,
}

impl SignedIdentifier {
    /// Read-only policy that expires at `expires_on`
    #[must_use]
    pub fn read_only(id: impl Into<String>, expires_on: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            access_policy: AccessPolicy {
                expires_on,
                permissions: AccessPermissions::read_only(),
            },
        }
    }
}
