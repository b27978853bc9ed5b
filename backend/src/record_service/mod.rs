//! Patient records backed by a blob container
//!
//! Records are projections of blobs computed on every call; nothing is cached
//! between requests. Signed tokens reference a stored access policy that the
//! service writes on startup and renews in the background.
mod error;
mod renewal;
mod settings;

use blob_storage::{
    BlobName, ContainerClient, SharedKeyCredential, SignedIdentifier, StoredPolicySas,
};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::instrument;

pub use error::{RecordError, RecordResult};
pub use renewal::PolicyRenewer;
pub use settings::{
    AccessPolicySettings, StorageSettings, DEFAULT_POLICY_ID, DEFAULT_POLICY_TTL,
    DEFAULT_STORAGE_TIMEOUT,
};

/// Display-oriented projection of a blob
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Record {
    /// Name of the blob
    pub name: String,
    /// Absolute, unsigned URI of the blob
    #[serde(rename = "imageURI")]
    pub image_uri: String,
    /// Signed query string, starting with `?`, to append to `imageURI`
    #[serde(
        rename = "sasToken",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sas_token: Option<String>,
}

/// Record service bound to one container
pub struct RecordService {
    container: ContainerClient,
    signing_credential: Option<SharedKeyCredential>,
    policy: AccessPolicySettings,
}

impl RecordService {
    /// Creates a record service without touching the network
    ///
    /// # Arguments
    ///
    /// * `container` - Client for the container holding the images
    /// * `signing_credential` - Shared key used to sign tokens; signed records fail
    ///   with `RecordError::SigningFailure` when absent
    /// * `policy` - Stored access policy the tokens reference
    #[must_use]
    pub const fn new(
        container: ContainerClient,
        signing_credential: Option<SharedKeyCredential>,
        policy: AccessPolicySettings,
    ) -> Self {
        Self {
            container,
            signing_credential,
            policy,
        }
    }

    /// Connects to the configured container and writes the stored access policy
    ///
    /// The service must not serve traffic unless this succeeds.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::ConfigurationInvalid` for an unusable connection string,
    /// `RecordError::StorageUnavailable` when the store cannot be reached and
    /// `RecordError::StorageRejected` when the policy cannot be written
    pub async fn connect(settings: &StorageSettings) -> RecordResult<Self> {
        let container = ContainerClient::from_connection_string(
            &settings.connection_string,
            settings.container.clone(),
            settings.request_timeout,
        )?;

        let signing_credential = match settings.signing_credential() {
            Ok(credential) => Some(credential),
            Err(e) => {
                tracing::warn!("Signed records are disabled: {e}");
                None
            }
        };

        let service = Self::new(container, signing_credential, settings.policy.clone());
        let expires_on = service.ensure_access_policy().await?;

        tracing::info!(
            container = %service.container.container_name(),
            policy = %service.policy.identifier,
            %expires_on,
            "✅ Record service connected"
        );

        Ok(service)
    }

    /// Stored access policy settings
    #[must_use]
    pub const fn policy(&self) -> &AccessPolicySettings {
        &self.policy
    }

    /// Lists one record per blob in the container, in the store's listing order
    ///
    /// # Errors
    ///
    /// Returns `RecordError::StorageUnavailable` when the store cannot be reached and
    /// `RecordError::StorageRejected` for any other listing failure
    #[instrument(skip(self), fields(container = %self.container.container_name()))]
    pub async fn list_records(&self) -> RecordResult<Vec<Record>> {
        let records: Vec<Record> = self
            .container
            .list_blobs()
            .map_ok(|blob| self.record_for(&blob.name))
            .try_collect()
            .await?;

        tracing::debug!(count = records.len(), "Listed records");
        Ok(records)
    }

    /// Record for a named blob
    ///
    /// The URI is derived from the name alone; the blob is not required to exist.
    #[must_use]
    pub fn get_record(&self, name: &BlobName) -> Record {
        self.record_for(name)
    }

    /// Record for a named blob with a signed token referencing the stored policy
    ///
    /// # Errors
    ///
    /// Returns `RecordError::SigningFailure` when no usable shared key is configured
    #[instrument(skip(self), fields(container = %self.container.container_name()))]
    pub fn get_secure_record(&self, name: &BlobName) -> RecordResult<Record> {
        let credential = self.signing_credential.as_ref().ok_or_else(|| {
            RecordError::SigningFailure("no usable shared key credential is configured".to_string())
        })?;

        let token = StoredPolicySas::new(
            self.container.container_name().clone(),
            self.policy.identifier.as_str(),
        )
        .sign(credential)?;

        Ok(Record {
            sas_token: Some(token.to_query_string()),
            ..self.record_for(name)
        })
    }

    /// Writes the stored access policy as the container's only signed identifier
    ///
    /// Every call resets the expiry to now plus the configured TTL and drops any
    /// other identifiers on the container. Tokens already handed out reference the
    /// same identifier, so each write extends them too.
    ///
    /// # Errors
    ///
    /// Returns `RecordError::ConfigurationInvalid` when the TTL does not fit a
    /// timestamp, `RecordError::StorageUnavailable` when the store cannot be reached
    /// and `RecordError::StorageRejected` when the write is refused
    #[instrument(skip(self), fields(container = %self.container.container_name(), policy = %self.policy.identifier))]
    pub async fn ensure_access_policy(&self) -> RecordResult<DateTime<Utc>> {
        let ttl = chrono::Duration::from_std(self.policy.ttl).map_err(|e| {
            RecordError::ConfigurationInvalid(format!("access policy TTL out of range: {e}"))
        })?;
        let expires_on = Utc::now().checked_add_signed(ttl).ok_or_else(|| {
            RecordError::ConfigurationInvalid(format!(
                "access policy TTL of {}s overflows the expiry time",
                self.policy.ttl.as_secs()
            ))
        })?;

        self.container
            .set_access_policy(&[SignedIdentifier::read_only(
                self.policy.identifier.as_str(),
                expires_on,
            )])
            .await?;

        tracing::debug!(%expires_on, "Stored access policy written");
        Ok(expires_on)
    }

    fn record_for(&self, name: &BlobName) -> Record {
        Record {
            name: name.to_string(),
            image_uri: self.container.blob_url(name).to_string(),
            sas_token: None,
        }
    }
}
