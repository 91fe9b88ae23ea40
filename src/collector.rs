//! Periodic collection trigger
//!
//! Drives a [`Collector`] on a fixed cadence until its cancellation token
//! fires. A failed collection is logged and the next tick runs as usual;
//! one bad `jcmd` run never stops the loop.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Something that captures one report per call
#[async_trait::async_trait]
pub trait Collector: Send + Sync {
    /// Capture a report, returning the stored artifact path
    async fn collect(&self, cancel: &CancellationToken) -> crate::Result<PathBuf>;

    /// Short label used in log lines
    fn describe(&self) -> String;
}

/// Fixed-interval driver for a [`Collector`]
pub struct CollectionTrigger {
    collector: Arc<dyn Collector>,
    interval: Duration,
}

impl CollectionTrigger {
    pub fn new(collector: Arc<dyn Collector>, interval: Duration) -> Self {
        Self {
            collector,
            interval,
        }
    }

    /// Interval in whole seconds, as configured (0 disables collection)
    pub fn every_secs(collector: Arc<dyn Collector>, secs: u64) -> Self {
        Self::new(collector, Duration::from_secs(secs))
    }

    pub fn is_enabled(&self) -> bool {
        !self.interval.is_zero()
    }

    /// Start the collection loop.
    ///
    /// Returns `None` without spawning anything when the interval is zero.
    /// The first collection runs immediately.
    pub fn spawn(self, cancel: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.is_enabled() {
            tracing::info!("Periodic NMT collection disabled (interval = 0)");
            return None;
        }

        tracing::info!(
            collector = %self.collector.describe(),
            interval_secs = self.interval.as_secs_f64(),
            "Starting periodic NMT collection"
        );
        Some(tokio::spawn(self.run(cancel)))
    }

    async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!(collector = %self.collector.describe(), "Collecting NMT report");
                    match self.collector.collect(&cancel).await {
                        Ok(path) => {
                            tracing::debug!(path = %path.display(), "NMT collection finished");
                        }
                        Err(crate::Error::Generation(crate::error::GenerationError::Cancelled)) => {
                            break;
                        }
                        Err(e) => {
                            tracing::error!(
                                collector = %self.collector.describe(),
                                error = %e,
                                "NMT collection failed"
                            );
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    break;
                }
            }
        }

        tracing::info!("Periodic NMT collection stopped");
    }
}
