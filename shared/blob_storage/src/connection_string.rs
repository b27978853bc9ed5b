//! Storage account connection string parsing

use std::{collections::HashMap, fmt};

use url::Url;

use crate::error::{BlobStorageError, BlobStorageResult};

/// Account name used by the local storage emulator
pub const DEVELOPMENT_ACCOUNT_NAME: &str = "devstoreaccount1";

/// Well-known, public account key of the local storage emulator
pub const DEVELOPMENT_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

/// Blob endpoint of the local storage emulator
pub const DEVELOPMENT_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

const DEFAULT_PROTOCOL: &str = "https";
const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Parsed storage account connection string
///
/// Only the settings needed to reach the blob service with a shared key are kept.
#[derive(Clone, PartialEq, Eq)]
pub struct ConnectionString {
    /// Storage account name
    pub account_name: String,
    /// Base64-encoded storage account key
    pub account_key: String,
    /// Blob service endpoint, e.g. `https://account.blob.core.windows.net`
    pub blob_endpoint: Url,
}

impl ConnectionString {
    /// Parses a `Key=Value;Key=Value` connection string
    ///
    /// Keys are matched case-insensitively. `UseDevelopmentStorage=true` selects the
    /// local emulator. Otherwise `AccountName` and `AccountKey` are required and the
    /// endpoint comes from `BlobEndpoint` or is derived from
    /// `DefaultEndpointsProtocol`, `AccountName` and `EndpointSuffix`.
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::InvalidConnectionString` for malformed pairs, missing
    /// credentials or an endpoint that is not an absolute http(s) URL
    pub fn parse(raw: &str) -> BlobStorageResult<Self> {
        let mut settings = HashMap::new();

        for pair in raw.split(';').map(str::trim).filter(|pair| !pair.is_empty()) {
            let (key, value) = pair.split_once('=').ok_or_else(|| {
                BlobStorageError::InvalidConnectionString(format!(
                    "expected Key=Value, got {pair:?}"
                ))
            })?;
            settings.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }

        if settings
            .get("usedevelopmentstorage")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"))
        {
            return Self::development();
        }

        let account_name = required(&settings, "accountname", "AccountName")?;
        let account_key = required(&settings, "accountkey", "AccountKey")?;

        let endpoint = match settings.get("blobendpoint") {
            Some(endpoint) => endpoint.clone(),
            None => {
                let protocol = settings
                    .get("defaultendpointsprotocol")
                    .map_or(DEFAULT_PROTOCOL, String::as_str);
                let suffix = settings
                    .get("endpointsuffix")
                    .map_or(DEFAULT_ENDPOINT_SUFFIX, String::as_str);
                format!("{protocol}://{account_name}.blob.{suffix}")
            }
        };

        Ok(Self {
            blob_endpoint: parse_endpoint(&endpoint)?,
            account_name,
            account_key,
        })
    }

    /// Connection settings of the local storage emulator
    ///
    /// # Errors
    ///
    /// Never fails in practice; the emulator endpoint is a constant
    pub fn development() -> BlobStorageResult<Self> {
        Ok(Self {
            account_name: DEVELOPMENT_ACCOUNT_NAME.to_string(),
            account_key: DEVELOPMENT_ACCOUNT_KEY.to_string(),
            blob_endpoint: parse_endpoint(DEVELOPMENT_BLOB_ENDPOINT)?,
        })
    }
}

// Keep the account key out of logs
impl fmt::Debug for ConnectionString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionString")
            .field("account_name", &self.account_name)
            .field("account_key", &"<redacted>")
            .field("blob_endpoint", &self.blob_endpoint.as_str())
            .finish()
    }
}

fn required(
    settings: &HashMap<String, String>,
    key: &str,
    display_name: &str,
) -> BlobStorageResult<String> {
    settings
        .get(key)
        .filter(|value| !value.is_empty())
        .cloned()
        .ok_or_else(|| {
            BlobStorageError::InvalidConnectionString(format!("{display_name} is missing"))
        })
}

fn parse_endpoint(endpoint: &str) -> BlobStorageResult<Url> {
    let url = Url::parse(endpoint).map_err(|e| {
        BlobStorageError::InvalidConnectionString(format!("invalid blob endpoint {endpoint:?}: {e}"))
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(BlobStorageError::InvalidConnectionString(format!(
            "blob endpoint must be an http(s) URL: {endpoint:?}"
        )));
    }

    Ok(url)
}
