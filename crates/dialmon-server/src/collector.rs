use chrono::Utc;
use dialmon_common::types::{CycleResult, NormalizedMetric, SourceOutcome};
use dialmon_source::error::FetchError;
use dialmon_source::SourceAdapter;
use dialmon_storage::MetricStore;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("a collection cycle is already in progress")]
    CycleInFlight,
}

/// Orchestrates one collection cycle: fan out to every registered source
/// adapter, gather the normalized records, and append them to the store as
/// a single batch.
///
/// At most one cycle runs at a time. The guard is a compare-and-swap on
/// `in_flight`; a second caller (manual trigger or timer tick) gets
/// [`CollectError::CycleInFlight`] instead of queuing behind the running
/// cycle.
pub struct Collector {
    adapters: Vec<Arc<dyn SourceAdapter>>,
    store: Arc<dyn MetricStore>,
    fetch_timeout: Duration,
    in_flight: AtomicBool,
    last_result: Mutex<Option<CycleResult>>,
    total_stored: AtomicU64,
}

/// Clears the in-flight flag when the cycle finishes, including on panic
/// unwind through `collect_once`.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Collector {
    pub fn new(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn MetricStore>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            adapters,
            store,
            fetch_timeout,
            in_flight: AtomicBool::new(false),
            last_result: Mutex::new(None),
            total_stored: AtomicU64::new(0),
        }
    }

    /// Runs one complete collection cycle.
    ///
    /// # Errors
    ///
    /// Returns [`CollectError::CycleInFlight`] when another cycle holds the
    /// guard. Source fetch failures and store write failures do NOT surface
    /// here; they are recorded inside the returned [`CycleResult`] so one
    /// bad source never hides the outcome of the others.
    pub async fn run_cycle(&self) -> Result<CycleResult, CollectError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CollectError::CycleInFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let result = self.collect_once().await;

        self.total_stored
            .fetch_add(result.total_stored as u64, Ordering::Relaxed);
        *self.lock_last_result() = Some(result.clone());

        if result.success() {
            tracing::info!(
                fetched = result.total_fetched,
                stored = result.total_stored,
                dropped = result.dropped,
                "Collection cycle completed"
            );
        } else {
            tracing::warn!(
                fetched = result.total_fetched,
                stored = result.total_stored,
                failed_sources = result.failed_sources(),
                store_error = ?result.store_error,
                "Collection cycle completed with errors"
            );
        }

        Ok(result)
    }

    async fn collect_once(&self) -> CycleResult {
        let started_at = Utc::now();

        // Fan out: one task per adapter, each bounded by the fetch timeout.
        let mut handles = Vec::with_capacity(self.adapters.len());
        for adapter in &self.adapters {
            let adapter = Arc::clone(adapter);
            let fetch_timeout = self.fetch_timeout;
            let source_type = adapter.source_type().to_string();
            let handle = tokio::spawn(async move {
                match tokio::time::timeout(fetch_timeout, adapter.fetch()).await {
                    Ok(Ok(batch)) => (source_type, Ok(batch)),
                    Ok(Err(e)) => (source_type, Err(e)),
                    Err(_) => (
                        source_type,
                        Err(FetchError::Timeout {
                            secs: fetch_timeout.as_secs(),
                        }),
                    ),
                }
            });
            handles.push(handle);
        }

        let mut records: Vec<NormalizedMetric> = Vec::new();
        let mut sources: Vec<SourceOutcome> = Vec::with_capacity(handles.len());
        let mut dropped: u32 = 0;

        for (handle, adapter) in handles.into_iter().zip(&self.adapters) {
            let fallback_type = adapter.source_type().to_string();
            match handle.await {
                Ok((source_type, Ok(batch))) => {
                    tracing::debug!(
                        source = %source_type,
                        fetched = batch.records.len(),
                        dropped = batch.dropped,
                        "Source fetch succeeded"
                    );
                    dropped += batch.dropped;
                    sources.push(SourceOutcome {
                        source_type,
                        fetched: batch.records.len(),
                        dropped: batch.dropped,
                        error: None,
                    });
                    records.extend(batch.records);
                }
                Ok((source_type, Err(e))) => {
                    tracing::warn!(source = %source_type, error = %e, "Source fetch failed");
                    sources.push(SourceOutcome {
                        source_type,
                        fetched: 0,
                        dropped: 0,
                        error: Some(e.to_string()),
                    });
                }
                Err(e) => {
                    tracing::error!(source = %fallback_type, error = %e, "Source task panicked");
                    sources.push(SourceOutcome {
                        source_type: fallback_type,
                        fetched: 0,
                        dropped: 0,
                        error: Some(format!("fetch task failed: {e}")),
                    });
                }
            }
        }

        let total_fetched = records.len();
        let (total_stored, store_error) = if records.is_empty() {
            (0, None)
        } else {
            match self.store.append(&records) {
                Ok(n) => (n, None),
                Err(e) => {
                    tracing::error!(error = %e, "Bulk store write failed");
                    (0, Some(e.to_string()))
                }
            }
        };

        CycleResult {
            started_at,
            finished_at: Utc::now(),
            total_fetched,
            total_stored,
            dropped,
            sources,
            store_error,
        }
    }

    /// Most recent cycle result, if any cycle has completed.
    pub fn last_result(&self) -> Option<CycleResult> {
        self.lock_last_result().clone()
    }

    /// Total records persisted over the process lifetime.
    pub fn total_stored(&self) -> u64 {
        self.total_stored.load(Ordering::Relaxed)
    }

    fn lock_last_result(&self) -> MutexGuard<'_, Option<CycleResult>> {
        self.last_result
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialmon_source::SourceBatch;
    use dialmon_storage::error::StoreError;
    use dialmon_storage::store::SqliteMetricStore;
    use dialmon_common::types::{MetricFilter, MetricsSummary, StoredMetric};

    struct MockAdapter {
        source_type: String,
        records: usize,
        dropped: u32,
        fail: bool,
        delay: Duration,
    }

    impl MockAdapter {
        fn ok(source_type: &str, records: usize) -> Self {
            Self {
                source_type: source_type.to_string(),
                records,
                dropped: 0,
                fail: false,
                delay: Duration::ZERO,
            }
        }

        fn failing(source_type: &str) -> Self {
            Self {
                fail: true,
                ..Self::ok(source_type, 0)
            }
        }

        fn slow(source_type: &str, records: usize, delay: Duration) -> Self {
            Self {
                delay,
                ..Self::ok(source_type, records)
            }
        }
    }

    #[async_trait::async_trait]
    impl SourceAdapter for MockAdapter {
        fn source_type(&self) -> &str {
            &self.source_type
        }

        fn source_name(&self) -> Option<&str> {
            None
        }

        async fn fetch(&self) -> dialmon_source::error::Result<SourceBatch> {
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(FetchError::Http {
                    status: 503,
                    body: "service unavailable".to_string(),
                });
            }
            let records = (0..self.records)
                .map(|i| NormalizedMetric {
                    timestamp: Utc::now(),
                    source_type: self.source_type.clone(),
                    source_name: None,
                    category: None,
                    name: format!("metric_{i}"),
                    value: i as f64,
                    unit: Some("count".to_string()),
                    raw: None,
                })
                .collect();
            Ok(SourceBatch {
                records,
                dropped: self.dropped,
            })
        }
    }

    struct FailingStore;

    impl MetricStore for FailingStore {
        fn append(&self, _records: &[NormalizedMetric]) -> dialmon_storage::error::Result<usize> {
            Err(StoreError::Other("disk full".to_string()))
        }

        fn query(
            &self,
            _filter: &MetricFilter,
        ) -> dialmon_storage::error::Result<Vec<StoredMetric>> {
            Ok(Vec::new())
        }

        fn summarize(
            &self,
            _filter: &MetricFilter,
        ) -> dialmon_storage::error::Result<MetricsSummary> {
            Ok(MetricsSummary {
                total: 0,
                oldest: None,
                newest: None,
                groups: Vec::new(),
            })
        }
    }

    fn memory_store() -> Arc<dyn MetricStore> {
        Arc::new(SqliteMetricStore::open_in_memory().unwrap())
    }

    fn collector(
        adapters: Vec<Arc<dyn SourceAdapter>>,
        store: Arc<dyn MetricStore>,
    ) -> Collector {
        Collector::new(adapters, store, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn all_sources_succeed() {
        let store = memory_store();
        let c = collector(
            vec![
                Arc::new(MockAdapter::ok("uccx", 3)),
                Arc::new(MockAdapter::ok("cucm", 2)),
            ],
            store.clone(),
        );

        let result = c.run_cycle().await.unwrap();
        assert!(result.success());
        assert_eq!(result.total_fetched, 5);
        assert_eq!(result.total_stored, 5);
        assert_eq!(result.sources.len(), 2);
        assert_eq!(store.query(&MetricFilter::default()).unwrap().len(), 5);
        assert_eq!(c.total_stored(), 5);
    }

    #[tokio::test]
    async fn partial_failure_stores_surviving_records() {
        let store = memory_store();
        let c = collector(
            vec![
                Arc::new(MockAdapter::failing("uccx")),
                Arc::new(MockAdapter::ok("cucm", 2)),
            ],
            store.clone(),
        );

        let result = c.run_cycle().await.unwrap();
        assert!(!result.success());
        assert_eq!(result.failed_sources(), 1);
        assert_eq!(result.total_stored, 2);

        let failed = result
            .sources
            .iter()
            .find(|s| s.source_type == "uccx")
            .unwrap();
        assert!(failed.error.as_deref().unwrap().contains("503"));

        // Only the healthy source's records made it to the store
        let stored = store.query(&MetricFilter::default()).unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|m| m.server_type == "cucm"));
    }

    #[tokio::test]
    async fn every_adapter_gets_an_outcome_entry() {
        let c = collector(
            vec![
                Arc::new(MockAdapter::ok("uccx", 1)),
                Arc::new(MockAdapter::failing("cucm")),
                Arc::new(MockAdapter::ok("uccx", 2)),
            ],
            memory_store(),
        );

        let result = c.run_cycle().await.unwrap();
        assert_eq!(result.sources.len(), 3);
        let succeeded = result.sources.iter().filter(|s| s.error.is_none()).count();
        assert_eq!(succeeded + result.failed_sources(), 3);
        assert_eq!(result.total_fetched, 3);
    }

    #[tokio::test]
    async fn concurrent_cycle_is_rejected() {
        let c = Arc::new(collector(
            vec![Arc::new(MockAdapter::slow(
                "uccx",
                1,
                Duration::from_millis(300),
            ))],
            memory_store(),
        ));

        let first = {
            let c = Arc::clone(&c);
            tokio::spawn(async move { c.run_cycle().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;

        let second = c.run_cycle().await;
        assert!(matches!(second, Err(CollectError::CycleInFlight)));

        let result = first.await.unwrap().unwrap();
        assert!(result.success());

        // Guard released: a new cycle runs fine afterwards
        assert!(c.run_cycle().await.is_ok());
    }

    #[tokio::test]
    async fn store_failure_is_reported_not_raised() {
        let c = collector(
            vec![Arc::new(MockAdapter::ok("uccx", 3))],
            Arc::new(FailingStore),
        );

        let result = c.run_cycle().await.unwrap();
        assert!(!result.success());
        assert_eq!(result.total_fetched, 3);
        assert_eq!(result.total_stored, 0);
        assert!(result.store_error.as_deref().unwrap().contains("disk full"));
        assert_eq!(c.total_stored(), 0);
    }

    #[tokio::test]
    async fn dropped_records_are_counted() {
        let mut adapter = MockAdapter::ok("cucm", 2);
        adapter.dropped = 3;
        let c = collector(vec![Arc::new(adapter)], memory_store());

        let result = c.run_cycle().await.unwrap();
        assert!(result.success());
        assert_eq!(result.dropped, 3);
        assert_eq!(result.total_stored, 2);
    }

    #[tokio::test]
    async fn slow_source_times_out_without_blocking_others() {
        let store = memory_store();
        let c = Collector::new(
            vec![
                Arc::new(MockAdapter::slow("uccx", 1, Duration::from_secs(30))),
                Arc::new(MockAdapter::ok("cucm", 2)),
            ],
            store.clone(),
            Duration::from_millis(100),
        );

        let result = c.run_cycle().await.unwrap();
        assert_eq!(result.failed_sources(), 1);
        let timed_out = result
            .sources
            .iter()
            .find(|s| s.source_type == "uccx")
            .unwrap();
        assert!(timed_out.error.as_deref().unwrap().contains("timed out"));
        assert_eq!(result.total_stored, 2);
    }

    #[tokio::test]
    async fn empty_cycle_is_successful_and_skips_the_store() {
        let c = collector(
            vec![Arc::new(MockAdapter::ok("uccx", 0))],
            Arc::new(FailingStore),
        );

        // FailingStore would error on append; an empty batch must not touch it
        let result = c.run_cycle().await.unwrap();
        assert!(result.success());
        assert_eq!(result.total_stored, 0);
    }

    #[tokio::test]
    async fn last_result_tracks_the_latest_cycle() {
        let c = collector(vec![Arc::new(MockAdapter::ok("uccx", 1))], memory_store());
        assert!(c.last_result().is_none());

        c.run_cycle().await.unwrap();
        let last = c.last_result().unwrap();
        assert_eq!(last.total_stored, 1);
        assert!(last.finished_at >= last.started_at);
    }
}
