//! Storage and access policy settings

use std::{fmt, time::Duration};

use blob_storage::{ContainerName, SharedKeyCredential};

use super::error::{RecordError, RecordResult};

/// Identifier of the stored access policy referenced by signed tokens
pub const DEFAULT_POLICY_ID: &str = "patient-images-policy";

/// Lifetime of the stored access policy
pub const DEFAULT_POLICY_TTL: Duration = Duration::from_secs(60 * 60);

/// Deadline for a single storage call
pub const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Stored access policy settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPolicySettings {
    /// Identifier the policy is stored under
    pub identifier: String,
    /// How long a freshly written policy stays valid
    pub ttl: Duration,
    /// How often the policy is rewritten while the service runs
    ///
    /// Each rewrite also extends every token already issued. `None` leaves the
    /// startup policy in place, so all tokens stop working one TTL after startup.
    pub renewal_interval: Option<Duration>,
}

impl AccessPolicySettings {
    /// Validates the settings
    ///
    /// `renewal_interval` defaults to half the TTL; a zero interval disables renewal.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::ConfigurationInvalid` when the identifier is empty or
    /// longer than 64 characters, the TTL is zero, or renewal would happen only after
    /// the policy has already expired
    pub fn new(
        identifier: impl Into<String>,
        ttl: Duration,
        renewal_interval: Option<Duration>,
    ) -> RecordResult<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() || identifier.chars().count() > 64 {
            return Err(RecordError::ConfigurationInvalid(format!(
                "access policy identifier must be 1-64 characters: {identifier:?}"
            )));
        }

        if ttl.is_zero() {
            return Err(RecordError::ConfigurationInvalid(
                "access policy TTL must be positive".to_string(),
            ));
        }

        let renewal_interval = match renewal_interval {
            None => Some(ttl / 2),
            Some(interval) if interval.is_zero() => None,
            Some(interval) if interval >= ttl => {
                return Err(RecordError::ConfigurationInvalid(format!(
                    "access policy renewal interval ({}s) must be shorter than its TTL ({}s)",
                    interval.as_secs(),
                    ttl.as_secs()
                )));
            }
            Some(interval) => Some(interval),
        };

        Ok(Self {
            identifier,
            ttl,
            renewal_interval,
        })
    }
}

impl Default for AccessPolicySettings {
    fn default() -> Self {
        Self {
            identifier: DEFAULT_POLICY_ID.to_string(),
            ttl: DEFAULT_POLICY_TTL,
            renewal_interval: Some(DEFAULT_POLICY_TTL / 2),
        }
    }
}

/// Everything the record service needs to reach its container
#[derive(Clone)]
pub struct StorageSettings {
    /// Connection string for the container handle
    pub connection_string: String,
    /// Container holding the patient images
    pub container: ContainerName,
    /// Account name used only for signing tokens
    pub signing_account_name: Option<String>,
    /// Account key used only for signing tokens
    pub signing_account_key: Option<String>,
    /// Stored access policy settings
    pub policy: AccessPolicySettings,
    /// Deadline for each storage call
    pub request_timeout: Duration,
}

impl StorageSettings {
    /// Builds the credential used to sign tokens
    ///
    /// # Errors
    ///
    /// Returns `RecordError::SigningFailure` when the account name or key is missing
    /// or the key is not valid base64
    pub fn signing_credential(&self) -> RecordResult<SharedKeyCredential> {
        let (Some(account_name), Some(account_key)) =
            (&self.signing_account_name, &self.signing_account_key)
        else {
            return Err(RecordError::SigningFailure(
                "shared key account name and key are not configured".to_string(),
            ));
        };

        Ok(SharedKeyCredential::new(account_name.clone(), account_key)?)
    }
}

// Connection string and account key are secrets
impl fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageSettings")
            .field("connection_string", &"<redacted>")
            .field("container", &self.container)
            .field("signing_account_name", &self.signing_account_name)
            .field(
                "signing_account_key",
                &self.signing_account_key.as_ref().map(|_| "<redacted>"),
            )
            .field("policy", &self.policy)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
