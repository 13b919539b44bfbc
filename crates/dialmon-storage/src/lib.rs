//! Append-only persistence for normalized telephony metrics.
//!
//! The default implementation ([`store::SqliteMetricStore`]) is a single
//! SQLite database in WAL mode. Records are immutable once stored; there is
//! no update or delete path and retention is unbounded.

pub mod error;
pub mod store;


use dialmon_common::types::{MetricFilter, MetricsSummary, NormalizedMetric, StoredMetric};

/// Persistence backend for normalized metric records.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the store is accessed from the collection cycle and the REST
/// query handlers concurrently. Each append is its own transaction, so no
/// cycle-level locking is required here.
pub trait MetricStore: Send + Sync {
    /// Appends a batch of records in a single transaction.
    ///
    /// All-or-nothing: if the write fails, no record from `records` becomes
    /// visible. Returns the number of records stored.
    fn append(&self, records: &[NormalizedMetric]) -> error::Result<usize>;

    /// Queries records matching `filter`, newest first. Ties on timestamp
    /// are broken by insertion order, newest insert first. An empty result
    /// is `Ok`, never an error.
    fn query(&self, filter: &MetricFilter) -> error::Result<Vec<StoredMetric>>;

    /// Returns aggregate counts/min/max/avg per (server_type, metric_name)
    /// group, plus the overall total and observed time range.
    fn summarize(&self, filter: &MetricFilter) -> error::Result<MetricsSummary>;
}
