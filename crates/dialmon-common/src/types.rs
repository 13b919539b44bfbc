use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One normalized telephony observation.
///
/// Every source adapter translates its vendor payload into this flat shape.
/// `timestamp`, `source_type`, `name` and `value` are always present; the
/// remaining fields may be absent depending on what the vendor exposes.
///
/// # Examples
///
/// ```
/// use dialmon_common::types::NormalizedMetric;
/// use chrono::Utc;
///
/// let m = NormalizedMetric {
///     timestamp: Utc::now(),
///     source_type: "uccx".to_string(),
///     source_name: Some("uccx-01".to_string()),
///     category: Some("agents".to_string()),
///     name: "active_agents".to_string(),
///     value: 12.0,
///     unit: Some("count".to_string()),
///     raw: None,
/// };
/// assert_eq!(m.source_type, "uccx");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NormalizedMetric {
    /// When the value was recorded (ingestion time if the source omits it)
    pub timestamp: DateTime<Utc>,
    /// Which adapter produced it (e.g. "uccx", "cucm")
    pub source_type: String,
    /// Originating server instance, if known
    pub source_name: Option<String>,
    /// Grouping label (e.g. "agents", "cpu")
    pub category: Option<String>,
    /// Metric identifier
    pub name: String,
    /// Numeric measurement
    pub value: f64,
    /// Unit label (e.g. "count", "percent", "seconds")
    pub unit: Option<String>,
    /// Original payload fragment, retained for debugging/audit
    pub raw: Option<String>,
}

/// A stored metric record as it exists in the database, including the
/// auto-assigned row id. Field names follow the persisted column names.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct StoredMetric {
    /// Auto-increment row id
    pub id: i64,
    /// When the value was recorded
    pub timestamp: DateTime<Utc>,
    /// Source type tag ("uccx", "cucm", ...)
    pub server_type: String,
    /// Originating server instance
    pub server_name: Option<String>,
    /// Grouping label
    pub metric_category: Option<String>,
    /// Metric identifier
    pub metric_name: String,
    /// Numeric measurement
    pub metric_value: f64,
    /// Unit label
    pub unit: Option<String>,
    /// Original payload fragment
    pub raw_data: Option<String>,
}

/// Query filter for the store's recency and summary surfaces.
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    /// Restrict to one source type
    pub source_type: Option<String>,
    /// Only records at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of records returned (query only)
    pub limit: Option<usize>,
}

/// Outcome of one source adapter within a collection cycle.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct SourceOutcome {
    /// Source type tag of the adapter
    pub source_type: String,
    /// Records fetched and normalized successfully
    pub fetched: usize,
    /// Records dropped for missing required fields
    pub dropped: u32,
    /// Fetch failure, if the adapter failed this cycle
    pub error: Option<String>,
}

/// Result of one complete collection cycle (fetch all adapters + store batch).
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct CycleResult {
    /// When the cycle started
    pub started_at: DateTime<Utc>,
    /// When the cycle finished
    pub finished_at: DateTime<Utc>,
    /// Records fetched across all successful adapters
    pub total_fetched: usize,
    /// Records actually persisted
    pub total_stored: usize,
    /// Records dropped across all adapters for missing required fields
    pub dropped: u32,
    /// Per-adapter outcomes, one entry per registered adapter
    pub sources: Vec<SourceOutcome>,
    /// Bulk write failure, if the store rejected the batch
    pub store_error: Option<String>,
}

impl CycleResult {
    /// A cycle is successful when every adapter fetched cleanly and the
    /// batch was stored.
    pub fn success(&self) -> bool {
        self.store_error.is_none() && self.sources.iter().all(|s| s.error.is_none())
    }

    /// Number of adapters that failed this cycle.
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

/// Aggregate statistics for one (server_type, metric_name) group.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricSummaryGroup {
    pub server_type: String,
    pub metric_name: String,
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}

/// Store-wide summary: total record count, observed time range, and
/// per-group aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
pub struct MetricsSummary {
    pub total: u64,
    pub oldest: Option<DateTime<Utc>>,
    pub newest: Option<DateTime<Utc>>,
    pub groups: Vec<MetricSummaryGroup>,
}
