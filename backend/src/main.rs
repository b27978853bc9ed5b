use std::sync::Arc;

use datadog_tracing::axum::shutdown_signal;
use patient_records::{
    record_service::{PolicyRenewer, RecordService},
    server,
    types::Environment,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let environment = Environment::from_env()?;

    // Use JSON format for staging/production (Datadog), regular format for development
    if environment.json_logs() {
        fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        fmt().with_env_filter(EnvFilter::from_default_env()).init();
    }

    info!("Starting Patient Records API in {environment} environment");

    let settings = environment.storage_settings()?;
    info!(?settings, "Loaded storage settings");

    // Refuse to serve until the stored access policy is in place
    let record_service = Arc::new(RecordService::connect(&settings).await?);

    let shutdown_token = CancellationToken::new();
    let signal_token = shutdown_token.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        info!("Shutting down Patient Records API...");
        signal_token.cancel();
    });

    let renewer_handle = match record_service.policy().renewal_interval {
        Some(interval) => {
            let renewer =
                PolicyRenewer::new(record_service.clone(), interval, shutdown_token.clone());
            Some(tokio::spawn(renewer.start()))
        }
        None => {
            info!("Stored access policy renewal disabled; tokens expire one TTL after startup");
            None
        }
    };

    // Blocks until shutdown
    let server_result = server::start(environment, record_service, shutdown_token.clone()).await;

    // Stop the renewer as well if the server exited on its own
    shutdown_token.cancel();
    if let Some(handle) = renewer_handle {
        handle.await.ok();
    }

    info!("✅ Patient Records API shutdown complete");

    server_result
}
