//! XML payloads of the container REST operations

use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::{events::Event, Reader};
use serde::Serialize;

use crate::{error::BlobStorageResult, policy::SignedIdentifier};

pub(super) const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="utf-8"?>"#;

/// Element path of a blob name inside a `comp=list` response
const BLOB_NAME_PATH: [&[u8]; 4] = [b"EnumerationResults", b"Blobs", b"Blob", b"Name"];

/// Element path of the continuation marker
const NEXT_MARKER_PATH: [&[u8]; 2] = [b"EnumerationResults", b"NextMarker"];

/// Body of a `comp=list` response
#[derive(Debug, Default, PartialEq, Eq)]
pub(super) struct ListPage {
    pub names: Vec<String>,
    pub next_marker: Option<String>,
}

/// Reads a listing page with a pull parser
///
/// Blob names are kept byte for byte. The serde deserializer trims text content,
/// which would turn `" scan "` into the name of a different blob.
pub(super) fn parse_list_page(body: &str) -> BlobStorageResult<ListPage> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(false);

    let mut page = ListPage::default();
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                path.push(start.name().as_ref().to_vec());
                text.clear();
            }
            Event::Text(content) => text.push_str(&content.unescape()?),
            Event::CData(content) => text.push_str(&String::from_utf8_lossy(&content)),
            Event::End(_) => {
                if path_is(&path, &BLOB_NAME_PATH) {
                    page.names.push(std::mem::take(&mut text));
                } else if path_is(&path, &NEXT_MARKER_PATH) && !text.is_empty() {
                    page.next_marker = Some(std::mem::take(&mut text));
                }
                path.pop();
                text.clear();
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(page)
}

fn path_is(path: &[Vec<u8>], expected: &[&[u8]]) -> bool {
    path.len() == expected.len() && path.iter().zip(expected).all(|(a, b)| a == b)
}

/// Body of the `comp=acl` write
#[derive(Debug, Default, Serialize)]
#[serde(rename = "SignedIdentifiers")]
pub(super) struct SignedIdentifiers {
    #[serde(rename = "SignedIdentifier")]
    pub identifiers: Vec<SignedIdentifierXml>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct SignedIdentifierXml {
    pub id: String,
    pub access_policy: AccessPolicyXml,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub(super) struct AccessPolicyXml {
    pub expiry: String,
    pub permission: String,
}

impl From<&SignedIdentifier> for SignedIdentifierXml {
    fn from(identifier: &SignedIdentifier) -> Self {
        let policy = &identifier.access_policy;
        Self {
            id: identifier.id.clone(),
            access_policy: AccessPolicyXml {
                expiry: xml_time(policy.expires_on),
                permission: policy.permissions.to_string(),
            },
        }
    }
}

fn xml_time(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
