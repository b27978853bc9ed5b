use std::{sync::Arc, time::Duration};

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::RecordService;

/// Rewrites the stored access policy on a fixed schedule until shutdown
///
/// Without renewal the policy written at startup expires after its TTL and every
/// token minted afterwards references a dead identifier.
pub struct PolicyRenewer {
    record_service: Arc<RecordService>,
    interval: Duration,
    shutdown: CancellationToken,
}

impl PolicyRenewer {
    /// Creates a renewer that fires every `interval`, starting one interval from now
    #[must_use]
    pub const fn new(
        record_service: Arc<RecordService>,
        interval: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            record_service,
            interval,
            shutdown,
        }
    }

    /// Runs until the shutdown token is cancelled
    pub async fn start(self) {
        info!(
            interval_secs = self.interval.as_secs(),
            "Starting PolicyRenewer"
        );

        // The policy was just written by `RecordService::connect`
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => self.renew_once().await,
                () = self.shutdown.cancelled() => {
                    info!("PolicyRenewer shutting down");
                    break;
                }
            }
        }

        info!("PolicyRenewer shutdown complete");
    }

    async fn renew_once(&self) {
        match self.record_service.ensure_access_policy().await {
            Ok(expires_on) => info!(%expires_on, "Stored access policy renewed"),
            // Retried on the next tick
            Err(e) => tracing::error!("Failed to renew stored access policy: {e}"),
        }
    }
}
