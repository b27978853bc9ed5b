//! Shared Key credential and request authorization

use std::{collections::BTreeMap, fmt};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{
    header::{HeaderValue, AUTHORIZATION},
    Request,
};
use sha2::Sha256;
use url::Url;

use crate::error::{BlobStorageError, BlobStorageResult};

/// REST API version sent with every request
pub const STORAGE_API_VERSION: &str = "2021-08-06";

/// Name of the request timestamp header
pub const MS_DATE_HEADER: &str = "x-ms-date";

/// Name of the REST API version header
pub const MS_VERSION_HEADER: &str = "x-ms-version";

/// Standard headers that take part in the string-to-sign, in signing order
const SIGNED_STANDARD_HEADERS: [&str; 10] = [
    "content-encoding",
    "content-language",
    "content-length",
    "content-md5",
    "content-type",
    "date",
    "if-modified-since",
    "if-match",
    "if-none-match",
    "if-unmodified-since",
];

/// Storage account name and key used to sign requests and SAS tokens
#[derive(Clone)]
pub struct SharedKeyCredential {
    account_name: String,
    key: Vec<u8>,
}

impl SharedKeyCredential {
    /// Creates a credential from an account name and a base64-encoded account key
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::Signing` if the name is empty or the key is empty or
    /// not valid base64
    pub fn new(account_name: impl Into<String>, account_key: &str) -> BlobStorageResult<Self> {
        let account_name = account_name.into();
        if account_name.is_empty() {
            return Err(BlobStorageError::Signing(
                "account name must not be empty".to_string(),
            ));
        }

        let key = STANDARD
            .decode(account_key.trim())
            .map_err(|e| BlobStorageError::Signing(format!("account key is not base64: {e}")))?;
        if key.is_empty() {
            return Err(BlobStorageError::Signing(
                "account key must not be empty".to_string(),
            ));
        }

        Ok(Self { account_name, key })
    }

    /// Storage account name
    #[must_use]
    pub fn account_name(&self) -> &str {
        &self.account_name
    }

    /// Computes the base64-encoded HMAC-SHA256 of `string_to_sign`
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::Signing` if the MAC cannot be keyed
    pub fn sign(&self, string_to_sign: &str) -> BlobStorageResult<String> {
        let mut mac = Hmac::<Sha256>::new_from_slice(&self.key)
            .map_err(|e| BlobStorageError::Signing(e.to_string()))?;
        mac.update(string_to_sign.as_bytes());
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Stamps `x-ms-date` and `x-ms-version` on the request and adds a
    /// `SharedKey` authorization header
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::Signing` if a header value cannot be encoded
    pub fn authorize(&self, request: &mut Request, now: DateTime<Utc>) -> BlobStorageResult<()> {
        let headers = request.headers_mut();
        headers.insert(MS_DATE_HEADER, header_value(&rfc1123(now))?);
        headers.insert(MS_VERSION_HEADER, HeaderValue::from_static(STORAGE_API_VERSION));

        let signature = self.sign(&self.string_to_sign(request))?;
        let authorization = header_value(&format!("SharedKey {}:{signature}", self.account_name))?;
        request.headers_mut().insert(AUTHORIZATION, authorization);

        Ok(())
    }

    /// Builds the Shared Key string-to-sign for a request
    #[must_use]
    pub fn string_to_sign(&self, request: &Request) -> String {
        let headers = request.headers();
        let body_len = request
            .body()
            .and_then(reqwest::Body::as_bytes)
            .map_or(0, <[u8]>::len);

        let mut lines = vec![request.method().as_str().to_string()];
        for name in SIGNED_STANDARD_HEADERS {
            let value = if name == "content-length" {
                // Zero length is signed as an empty line
                if body_len == 0 {
                    String::new()
                } else {
                    body_len.to_string()
                }
            } else {
                headers
                    .get(name)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or_default()
                    .to_string()
            };
            lines.push(value);
        }
        lines.push(
            headers
                .get("range")
                .and_then(|value| value.to_str().ok())
                .unwrap_or_default()
                .to_string(),
        );

        let mut canonical_headers: Vec<(String, String)> = headers
            .iter()
            .filter(|(name, _)| name.as_str().starts_with("x-ms-"))
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    value.to_str().unwrap_or_default().trim().to_string(),
                )
            })
            .collect();
        canonical_headers.sort();

        let mut string_to_sign = lines.join("\n");
        string_to_sign.push('\n');
        for (name, value) in canonical_headers {
            string_to_sign.push_str(&format!("{name}:{value}\n"));
        }
        string_to_sign.push_str(&self.canonicalized_resource(request.url()));

        string_to_sign
    }

    /// `/account/path` followed by one `\nname:values` line per query parameter
    fn canonicalized_resource(&self, url: &Url) -> String {
        let mut params: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, value) in url.query_pairs() {
            params
                .entry(name.to_lowercase())
                .or_default()
                .push(value.into_owned());
        }

        let mut resource = format!("/{}{}", self.account_name, url.path());
        for (name, mut values) in params {
            values.sort();
            resource.push_str(&format!("\n{name}:{}", values.join(",")));
        }

        resource
    }
}

impl fmt::Debug for SharedKeyCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedKeyCredential")
            .field("account_name", &self.account_name)
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Formats a timestamp the way the `x-ms-date` header expects
#[must_use]
pub fn rfc1123(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

fn header_value(value: &str) -> BlobStorageResult<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| BlobStorageError::Signing(format!("invalid header value: {e}")))
}
