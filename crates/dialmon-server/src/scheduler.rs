use crate::collector::{CollectError, Collector};
use std::sync::Arc;
use std::time::Duration;

/// Background poll loop: runs one collection cycle per interval tick.
///
/// The scheduler and the manual `/collect` trigger share the collector's
/// in-flight guard, so a tick that lands while a manual cycle is running
/// is skipped rather than queued.
pub struct PollScheduler {
    collector: Arc<Collector>,
    interval: Duration,
}

impl PollScheduler {
    pub fn new(collector: Arc<Collector>, interval_secs: u64) -> Self {
        Self {
            collector,
            interval: Duration::from_secs(interval_secs.max(1)),
        }
    }

    pub async fn run(self) {
        tracing::info!(interval_secs = self.interval.as_secs(), "Poll scheduler started");
        let mut ticker = tokio::time::interval(self.interval);
        // The first tick fires immediately; collect right away at startup
        loop {
            ticker.tick().await;
            match self.collector.run_cycle().await {
                Ok(result) => {
                    if !result.success() {
                        tracing::warn!(
                            failed_sources = result.failed_sources(),
                            store_error = ?result.store_error,
                            "Scheduled cycle had errors"
                        );
                    }
                }
                Err(CollectError::CycleInFlight) => {
                    tracing::debug!("Cycle already in progress, skipping scheduled tick");
                }
            }
        }
    }
}
