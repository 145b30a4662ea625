use std::time::Duration;

use remitdesk_application::{IdempotencyService, RateLimitService};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Handle to the background task evicting stale limiter windows and expired
/// idempotency records.
pub struct RateLimitSweeper {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl RateLimitSweeper {
    /// Stops the task and waits for it to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(error) = self.handle.await {
            warn!(error = %error, "rate limit sweeper terminated abnormally");
        }
    }
}

/// Spawns the periodic sweep. The first pass runs after one `interval`.
pub fn spawn_rate_limit_sweeper(
    rate_limit_service: RateLimitService,
    idempotency_service: IdempotencyService,
    interval: Duration,
    retention: chrono::Duration,
) -> RateLimitSweeper {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("rate limit sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    sweep(&rate_limit_service, &idempotency_service, retention).await;
                }
            }
        }
    });

    RateLimitSweeper {
        shutdown_tx,
        handle,
    }
}

async fn sweep(
    rate_limit_service: &RateLimitService,
    idempotency_service: &IdempotencyService,
    retention: chrono::Duration,
) {
    match rate_limit_service.cleanup(retention).await {
        Ok(evicted) if evicted > 0 => debug!(evicted, "evicted stale rate limit windows"),
        Ok(_) => {}
        Err(error) => warn!(error = %error, "rate limit sweep failed"),
    }

    match idempotency_service.purge_expired().await {
        Ok(purged) if purged > 0 => debug!(purged, "purged expired idempotency keys"),
        Ok(_) => {}
        Err(error) => warn!(error = %error, "idempotency purge failed"),
    }
}
