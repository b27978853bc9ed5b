//! Container-scoped blob service operations
mod xml;

use std::time::Duration;

use chrono::Utc;
use futures::{stream, Stream, TryStreamExt};
use reqwest::{header::CONTENT_TYPE, Client, Method, RequestBuilder, Response, StatusCode};
use tracing::instrument;
use url::Url;

use crate::{
    connection_string::ConnectionString,
    credential::SharedKeyCredential,
    error::{BlobStorageError, BlobStorageResult},
    names::{BlobName, ContainerName},
    policy::SignedIdentifier,
};

use self::xml::{SignedIdentifierXml, SignedIdentifiers, XML_DECLARATION};

/// Header carrying the service's machine-readable error code
const MS_ERROR_CODE_HEADER: &str = "x-ms-error-code";

/// A blob returned by a container listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Name of the blob, exactly as the service reported it
    pub name: BlobName,
}

/// One page of a container listing
#[derive(Debug)]
struct BlobPage {
    items: Vec<BlobItem>,
    next_marker: Option<String>,
}

/// Client bound to a single blob container
///
/// The underlying `reqwest::Client` pools connections, so one instance can be
/// shared by concurrent callers.
#[derive(Debug, Clone)]
pub struct ContainerClient {
    http: Client,
    credential: SharedKeyCredential,
    container_name: ContainerName,
    container_url: Url,
}

impl ContainerClient {
    /// Creates a client for `container_name` using the endpoint and shared key from
    /// a connection string
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::InvalidConnectionString` if the account key cannot
    /// be used for signing
    pub fn new(
        http: Client,
        connection: &ConnectionString,
        container_name: ContainerName,
    ) -> BlobStorageResult<Self> {
        let credential =
            SharedKeyCredential::new(connection.account_name.clone(), &connection.account_key)
                .map_err(|e| BlobStorageError::InvalidConnectionString(e.to_string()))?;

        let mut container_url = connection.blob_endpoint.clone();
        container_url.set_query(None);
        container_url.set_fragment(None);
        if let Ok(mut segments) = container_url.path_segments_mut() {
            segments.pop_if_empty().push(container_name.as_str());
        }

        Ok(Self {
            http,
            credential,
            container_name,
            container_url,
        })
    }

    /// Parses a connection string and creates a client whose every request is
    /// bounded by `timeout`
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::InvalidConnectionString` for an unusable connection
    /// string and `BlobStorageError::Unavailable` if the HTTP client cannot be built
    pub fn from_connection_string(
        connection_string: &str,
        container_name: ContainerName,
        timeout: Duration,
    ) -> BlobStorageResult<Self> {
        let connection = ConnectionString::parse(connection_string)?;
        let http = Client::builder().timeout(timeout).build()?;
        Self::new(http, &connection, container_name)
    }

    /// Name of the container
    #[must_use]
    pub const fn container_name(&self) -> &ContainerName {
        &self.container_name
    }

    /// Absolute, unsigned URL of a blob
    ///
    /// This is pure string construction; the blob does not have to exist.
    #[must_use]
    pub fn blob_url(&self, blob_name: &BlobName) -> Url {
        let mut url = self.container_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.extend(blob_name.segments());
        }
        url
    }

    /// Lists every blob in the container, fetching pages lazily as the stream is
    /// polled
    pub fn list_blobs(&self) -> impl Stream<Item = BlobStorageResult<BlobItem>> + '_ {
        // `Some(marker)` means another page is pending; the first page has no marker
        stream::try_unfold(Some(None::<String>), move |pending| async move {
            let Some(marker) = pending else {
                return Ok::<_, BlobStorageError>(None);
            };

            let page = self.list_blobs_page(marker.as_deref()).await?;
            let next = page.next_marker.map(Some);
            let items = stream::iter(page.items.into_iter().map(Ok::<_, BlobStorageError>));

            Ok::<_, BlobStorageError>(Some((items, next)))
        })
        .try_flatten()
    }

    #[instrument(skip(self), fields(container = %self.container_name))]
    async fn list_blobs_page(&self, marker: Option<&str>) -> BlobStorageResult<BlobPage> {
        let mut url = self.container_url.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("restype", "container").append_pair("comp", "list");
            if let Some(marker) = marker {
                query.append_pair("marker", marker);
            }
        }

        let response = self.send(self.http.request(Method::GET, url)).await?;
        let body = response.text().await?;
        let page = xml::parse_list_page(&body)?;

        let items: Vec<BlobItem> = page
            .names
            .into_iter()
            .map(|name| BlobItem {
                name: BlobName::from_listing(name),
            })
            .collect();

        let next_marker = page.next_marker;
        tracing::debug!(
            count = items.len(),
            has_more = next_marker.is_some(),
            "Fetched blob listing page"
        );

        Ok(BlobPage { items, next_marker })
    }

    /// Replaces the container's stored access policies with `identifiers`
    ///
    /// Any identifier not in `identifiers` is removed.
    ///
    /// # Errors
    ///
    /// Returns `BlobStorageError::Unavailable` if the service cannot be reached and
    /// `BlobStorageError::Rejected` if it refuses the update
    #[instrument(skip(self, identifiers), fields(container = %self.container_name, count = identifiers.len()))]
    pub async fn set_access_policy(&self, identifiers: &[SignedIdentifier]) -> BlobStorageResult<()> {
        let body = SignedIdentifiers {
            identifiers: identifiers.iter().map(SignedIdentifierXml::from).collect(),
        };
        let body = format!("{XML_DECLARATION}{}", quick_xml::se::to_string(&body)?);

        let request = self
            .http
            .request(Method::PUT, self.acl_url())
            .header(CONTENT_TYPE, "application/xml")
            .body(body);

        self.send(request).await?;
        Ok(())
    }

    fn acl_url(&self) -> Url {
        let mut url = self.container_url.clone();
        url.query_pairs_mut()
            .append_pair("restype", "container")
            .append_pair("comp", "acl");
        url
    }

    /// Signs and sends a request, turning non-success statuses into errors
    async fn send(&self, request: RequestBuilder) -> BlobStorageResult<Response> {
        let mut request = request.build()?;
        self.credential.authorize(&mut request, Utc::now())?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let code = response
            .headers()
            .get(MS_ERROR_CODE_HEADER)
            .and_then(|value| value.to_str().ok())
            .map_or_else(
                || status.canonical_reason().unwrap_or("Unknown").to_string(),
                ToString::to_string,
            );

        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
            Err(BlobStorageError::Unavailable(format!("status {status}: {code}")))
        } else {
            Err(BlobStorageError::Rejected {
                status: status.as_u16(),
                code,
            })
        }
    }
}
