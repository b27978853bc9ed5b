use std::sync::Arc;
use std::time::Duration;

use aide::openapi::OpenApi;
use axum::{http::StatusCode, Extension};
use datadog_tracing::axum::{OtelAxumLayer, OtelInResponseLayer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::routes;
use crate::{record_service::RecordService, types::Environment};

/// Deadline for a whole HTTP request, storage calls included
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_PORT: u16 = 8080;

/// Starts the server with the given environment and dependencies
///
/// Serves until `shutdown` is cancelled, then drains in-flight requests.
///
/// # Errors
///
/// Returns an error if `PORT` is not a valid port or the server fails to bind
pub async fn start(
    environment: Environment,
    record_service: Arc<RecordService>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let mut openapi = OpenApi::default();

    let router = routes::handler()
        .finish_api(&mut openapi)
        .layer(Extension(openapi))
        .layer(Extension(environment))
        .layer(Extension(record_service))
        // Include trace context as header into the response
        .layer(OtelInResponseLayer)
        // Start OpenTelemetry trace on incoming request
        .layer(OtelAxumLayer::default())
        .layer(tower_http::timeout::TimeoutLayer::with_status_code(
            StatusCode::SERVICE_UNAVAILABLE,
            REQUEST_TIMEOUT,
        ));

    let addr = std::net::SocketAddr::from((
        [0, 0, 0, 0],
        std::env::var("PORT").map_or(Ok(DEFAULT_PORT), |p| p.parse())?,
    ));

    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🔄 Patient Records API started on http://{addr} ({environment})");

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(anyhow::Error::from)
}
