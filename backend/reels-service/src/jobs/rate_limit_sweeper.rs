//! Rate limit sweeper
//!
//! Drops admission entries whose window has elapsed. Runs on its own timer
//! so memory is reclaimed even when no traffic arrives.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::services::AdmissionController;

pub struct RateLimitSweeper {
    controller: Arc<AdmissionController>,
    interval: Duration,
}

impl RateLimitSweeper {
    pub fn new(controller: Arc<AdmissionController>, interval: Duration) -> Self {
        Self {
            controller,
            interval: interval.max(Duration::from_secs(1)),
        }
    }

    /// Spawn the sweep loop
    ///
    /// Sending on (or dropping) the returned sender stops the task.
    pub fn spawn(self) -> (watch::Sender<()>, JoinHandle<()>) {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(());

        let handle = tokio::spawn(async move {
            info!(
                interval_secs = self.interval.as_secs(),
                "Rate limit sweeper started"
            );

            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // first tick completes immediately
            timer.tick().await;

            loop {
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        info!("Rate limit sweeper received shutdown signal");
                        break;
                    }
                    _ = timer.tick() => {
                        let removed = self.controller.sweep_expired();
                        debug!(removed, remaining = self.controller.len(), "Rate limit sweep");
                    }
                }
            }

            info!("Rate limit sweeper stopped");
        });

        (shutdown_tx, handle)
    }
}
