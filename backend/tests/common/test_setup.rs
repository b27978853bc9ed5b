use std::sync::Arc;
use std::time::Duration;

use axum::{body::Body, http::Request, response::Response, Extension, Router};
use blob_storage::ContainerName;
use patient_records::{
    record_service::{AccessPolicySettings, RecordService, StorageSettings},
    routes,
    types::Environment,
};
use tower::ServiceExt;
use wiremock::MockServer;

use super::storage_mocks::{connection_string, mount_set_access_policy, ACCOUNT_KEY};

/// Setup test environment with logging
pub fn setup_test_env() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .try_init()
        .ok();
}

/// Knobs for a test service
#[derive(Debug, Clone)]
pub struct TestOptions {
    /// Configure the shared key used for signing tokens
    pub signing: bool,
    /// Deadline for each storage call
    pub storage_timeout: Duration,
    /// Stored access policy settings
    pub policy: AccessPolicySettings,
}

impl Default for TestOptions {
    fn default() -> Self {
        Self {
            signing: true,
            storage_timeout: Duration::from_secs(5),
            policy: AccessPolicySettings::default(),
        }
    }
}

/// Storage settings pointing at the mock server
pub fn storage_settings(server: &MockServer, options: &TestOptions) -> StorageSettings {
    StorageSettings {
        connection_string: connection_string(server),
        container: ContainerName::parse("patient-images").unwrap(),
        signing_account_name: options.signing.then(|| "devstoreaccount1".to_string()),
        signing_account_key: options.signing.then(|| ACCOUNT_KEY.to_string()),
        policy: options.policy.clone(),
        request_timeout: options.storage_timeout,
    }
}

/// Router and record service wired to a mock blob store
pub struct TestSetup {
    pub router: Router,
    pub server: MockServer,
    pub record_service: Arc<RecordService>,
}

impl TestSetup {
    pub async fn new() -> Self {
        Self::with_options(TestOptions::default()).await
    }

    pub async fn with_options(options: TestOptions) -> Self {
        setup_test_env();

        let server = MockServer::start().await;
        mount_set_access_policy(&server, 200).await;

        let record_service = Arc::new(
            RecordService::connect(&storage_settings(&server, &options))
                .await
                .unwrap(),
        );

        let router = routes::handler()
            .layer(Extension(Environment::Development))
            .layer(Extension(record_service.clone()))
            .into();

        Self {
            router,
            server,
            record_service,
        }
    }

    /// Base URL of the container on the mock server
    pub fn container_url(&self) -> String {
        format!("{}{}", self.server.uri(), super::CONTAINER_PATH)
    }

    pub async fn send_get_request(
        &self,
        route: &str,
    ) -> Result<Response, Box<dyn std::error::Error>> {
        let request = Request::builder()
            .uri(route)
            .method("GET")
            .body(Body::empty())?;
        let response = self.router.clone().oneshot(request).await?;
        Ok(response)
    }

    pub async fn parse_response_body(
        &self,
        response: Response,
    ) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
        use http_body_util::BodyExt;

        let body = response.into_body().collect().await?.to_bytes();
        let json = serde_json::from_slice(&body)?;
        Ok(json)
    }
}
