//! ReplicationWorker - periodic dispatch of pending log entries
//!
//! Only started when `REPLICATION_INTERVAL_SECS` is non-zero; otherwise
//! dispatch happens on explicit `POST /api/replication/replicate` calls.

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::{Dispatcher, ReplicationError};

pub struct ReplicationWorker {
    dispatcher: Dispatcher,
    interval: Duration,
    shutdown: CancellationToken,
}

impl ReplicationWorker {
    pub fn new(dispatcher: Dispatcher, interval: Duration, shutdown: CancellationToken) -> Self {
        Self {
            dispatcher,
            interval,
            shutdown,
        }
    }

    /// Run until the shutdown token is cancelled
    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "ReplicationWorker started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await; // skip immediate tick

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::info!("ReplicationWorker shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    match self.dispatcher.dispatch_pending().await {
                        Ok(_) => {}
                        Err(ReplicationError::Disabled) => {
                            tracing::warn!("Replication disabled, ReplicationWorker stopping");
                            break;
                        }
                        Err(e) => tracing::error!("Scheduled dispatch failed: {e}"),
                    }
                }
            }
        }
    }
}
