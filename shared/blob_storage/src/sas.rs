//! Service shared access signatures bound to a stored access policy

use url::form_urlencoded;

use crate::{
    credential::{SharedKeyCredential, STORAGE_API_VERSION},
    error::BlobStorageResult,
    names::ContainerName,
};

/// Signed query string of a SAS, without the leading `?`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SasToken(String);

impl SasToken {
    /// The query parameters prefixed with `?`, ready to append to a blob URL
    #[must_use]
    pub fn to_query_string(&self) -> String {
        format!("?{}", self.0)
    }
}

/// Container-scoped service SAS that takes its permissions and expiry from a
/// stored access policy
///
/// The token carries only `sv`, `sr`, `si` and `sig`. The service rejects a SAS
/// that repeats a field the policy already sets.
#[derive(Debug, Clone)]
pub struct StoredPolicySas {
    container: ContainerName,
    identifier: String,
}

impl StoredPolicySas {
    /// SAS for `container` referencing the policy stored under `identifier`
    #[must_use]
    pub fn new(container: ContainerName, identifier: impl Into<String>) -> Self {
        Self {
            container,
            identifier: identifier.into(),
        }
    }

    /// Signs the SAS with a shared key
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::Signing` when the key cannot be used
    pub fn sign(&self, credential: &SharedKeyCredential) -> BlobStorageResult<SasToken> {
        let signature = credential.sign(&self.string_to_sign(credential.account_name()))?;

        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("sv", STORAGE_API_VERSION)
            .append_pair("sr", "c")
            .append_pair("si", &self.identifier)
            .append_pair("sig", &signature)
            .finish();

        Ok(SasToken(query))
    }

    /// String-to-sign of signed version `STORAGE_API_VERSION`
    ///
    /// Fields the stored policy supplies (permissions, start, expiry) and the
    /// unused optional fields are signed as empty lines.
    #[must_use]
    pub fn string_to_sign(&self, account_name: &str) -> String {
        [
            // sp, st, se
            "",
            "",
            "",
            &format!("/blob/{account_name}/{}", self.container),
            &self.identifier,
            // sip, spr
            "",
            "",
            STORAGE_API_VERSION,
            "c",
            // snapshot time, encryption scope
            "",
            "",
            // rscc, rscd, rsce, rscl, rsct
            "",
            "",
            "",
            "",
            "",
        ]
        .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credential() -> SharedKeyCredential {
        SharedKeyCredential::new("records", "c2VjcmV0LWtleQ==").unwrap()
    }

    fn sas() -> StoredPolicySas {
        StoredPolicySas::new(
            ContainerName::parse("patient-images").unwrap(),
            "patient-images-policy",
        )
    }

    #[test]
    fn test_string_to_sign() {
        assert_eq!(
            sas().string_to_sign("records"),
            "\n\n\n/blob/records/patient-images\npatient-images-policy\n\n\n2021-08-06\nc\n\n\n\n\n\n\n"
        );
    }

    #[test]
    fn test_token_known_answer() {
        // Signature of the string above keyed with "secret-key", computed independently
        assert_eq!(
            sas().sign(&credential()).unwrap().to_query_string(),
            "?sv=2021-08-06&sr=c&si=patient-images-policy\
             &sig=mInfcSo8nJXOVUhK0IF80zkl2oT5pqlU4AwZmcKX%2Bvc%3D"
        );
    }

    #[test]
    fn test_token_has_no_inline_grant() {
        let token = sas().sign(&credential()).unwrap().to_query_string();
        let keys: Vec<String> = form_urlencoded::parse(token.trim_start_matches('?').as_bytes())
            .map(|(key, _)| key.into_owned())
            .collect();

        assert_eq!(keys, vec!["sv", "sr", "si", "sig"]);
    }
}
