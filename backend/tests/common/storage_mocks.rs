use wiremock::{
    matchers::{method, path, query_param},
    Mock, MockServer, Request, ResponseTemplate,
};

/// Path of the test container on the mock storage account
pub const CONTAINER_PATH: &str = "/devstoreaccount1/patient-images";

/// Account key shared by the mock account and the signing credential
pub const ACCOUNT_KEY: &str = "c2VjcmV0LWtleQ==";

/// Connection string pointing at the mock server
pub fn connection_string(server: &MockServer) -> String {
    format!(
        "DefaultEndpointsProtocol=http;AccountName=devstoreaccount1;AccountKey={ACCOUNT_KEY};BlobEndpoint={}/devstoreaccount1;",
        server.uri()
    )
}

/// Listing body in the blob service's XML format
pub fn list_body(names: &[&str], next_marker: Option<&str>) -> String {
    let blobs: String = names
        .iter()
        .map(|name| {
            format!(
                "<Blob><Name>{name}</Name><Properties><Content-Length>2048</Content-Length><Content-Type>image/png</Content-Type></Properties></Blob>"
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?><EnumerationResults ContainerName="patient-images"><Blobs>{blobs}</Blobs><NextMarker>{}</NextMarker></EnumerationResults>"#,
        next_marker.unwrap_or_default()
    )
}

/// Accepts every access policy write
pub async fn mount_set_access_policy(server: &MockServer, status: u16) {
    Mock::given(method("PUT"))
        .and(path(CONTAINER_PATH))
        .and(query_param("restype", "container"))
        .and(query_param("comp", "acl"))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Serves a single listing page
pub async fn mount_list_blobs(server: &MockServer, names: &[&str]) {
    Mock::given(method("GET"))
        .and(path(CONTAINER_PATH))
        .and(query_param("comp", "list"))
        .respond_with(ResponseTemplate::new(200).set_body_string(list_body(names, None)))
        .mount(server)
        .await;
}

/// Fails every listing with `status` and the given storage error code
pub async fn mount_list_blobs_error(server: &MockServer, status: u16, code: &str) {
    Mock::given(method("GET"))
        .and(path(CONTAINER_PATH))
        .and(query_param("comp", "list"))
        .respond_with(ResponseTemplate::new(status).insert_header("x-ms-error-code", code))
        .mount(server)
        .await;
}

/// Access policy writes received by the mock server, oldest first
pub async fn access_policy_writes(server: &MockServer) -> Vec<String> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(is_access_policy_write)
        .map(|request| String::from_utf8_lossy(&request.body).into_owned())
        .collect()
}

/// Requests other than access policy writes
pub async fn data_requests(server: &MockServer) -> Vec<Request> {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| !is_access_policy_write(request))
        .collect()
}

fn is_access_policy_write(request: &Request) -> bool {
    request.method.as_str() == "PUT"
        && request
            .url
            .query_pairs()
            .any(|(key, value)| key == "comp" && value == "acl")
}
