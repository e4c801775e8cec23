//! Background timers: periodic sweep of the generated-images directory and a
//! scheduled restart.
//!
//! The restart does not re-exec anything. It cancels the shared shutdown
//! token, the server drains and `main` returns, and the process supervisor
//! starts a fresh instance.

use crate::config::HousekeepingConfig;
use crate::services::image_store::ImageStore;
use crate::services::metrics;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub struct Housekeeper {
    config: HousekeepingConfig,
    store: ImageStore,
    shutdown: CancellationToken,
}

impl Housekeeper {
    pub fn new(config: HousekeepingConfig, store: ImageStore, shutdown: CancellationToken) -> Self {
        Self {
            config,
            store,
            shutdown,
        }
    }

    /// Start both timers. Returns no handles when housekeeping is disabled.
    pub fn spawn(self) -> Vec<JoinHandle<()>> {
        if !self.config.enabled {
            tracing::info!("Housekeeping disabled by configuration");
            return Vec::new();
        }

        tracing::info!(
            cleanup_interval_secs = self.config.cleanup_interval_secs,
            cleanup_grace_secs = self.config.cleanup_grace_secs,
            restart_interval_secs = self.config.restart_interval_secs,
            "Starting housekeeping"
        );

        vec![
            tokio::spawn(cleanup_loop(
                self.store,
                self.config.cleanup_interval(),
                self.config.cleanup_grace(),
                self.shutdown.clone(),
            )),
            tokio::spawn(restart_loop(
                self.config.restart_interval(),
                self.shutdown,
            )),
        ]
    }
}

/// One sweep. Errors are logged; housekeeping never takes the service down.
pub async fn run_cleanup(store: &ImageStore, grace: Duration) -> usize {
    match store.sweep(grace).await {
        Ok(deleted) => {
            metrics::record_cleanup(deleted);
            tracing::info!(
                deleted,
                path = %store.base_path().display(),
                "Cleaned up generated images"
            );
            deleted
        }
        Err(e) => {
            tracing::error!(
                error = %e,
                path = %store.base_path().display(),
                "Error cleaning up generated images"
            );
            0
        }
    }
}

pub async fn cleanup_loop(
    store: ImageStore,
    period: Duration,
    grace: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; nothing to clean at boot.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Cleanup loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                run_cleanup(&store, grace).await;
            }
        }
    }
}

pub async fn restart_loop(period: Duration, shutdown: CancellationToken) {
    let mut ticker = interval(period);
    ticker.tick().await;

    tokio::select! {
        _ = shutdown.cancelled() => {
            tracing::debug!("Restart loop shutting down");
        }
        _ = ticker.tick() => {
            tracing::warn!(
                interval_secs = period.as_secs(),
                "Scheduled restart: shutting down for supervisor restart"
            );
            shutdown.cancel();
        }
    }
}
