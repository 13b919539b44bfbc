//! Parsing for the Cisco-style stats envelope shared by UCCX and CUCM
//! endpoints:
//!
//! ```json
//! {
//!   "server_type": "uccx",
//!   "timestamp": "2024-05-01T12:00:00.123456",
//!   "metrics": {
//!     "active_agents": { "value": 12, "unit": "count", "description": "..." }
//!   }
//! }
//! ```
//!
//! Individual metric entries are kept as raw JSON so an entry with vendor
//! extensions or a missing field never fails the whole batch.

use crate::error::FetchError;
use crate::SourceBatch;
use chrono::{DateTime, NaiveDateTime, Utc};
use dialmon_common::types::NormalizedMetric;
use serde::Deserialize;
use std::collections::HashMap;

#[derive(Debug, Deserialize)]
struct VendorStats {
    server_type: Option<String>,
    timestamp: Option<String>,
    #[serde(default)]
    metrics: HashMap<String, serde_json::Value>,
}

/// Vendor timestamps come in two flavors: RFC 3339 with an offset, or a
/// naive ISO string that is implicitly UTC (what CUCM/UCCX mocks emit).
fn parse_vendor_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Normalizes a vendor stats response body into a [`SourceBatch`].
///
/// Entries missing the required `value` field are dropped and counted,
/// not fatal. Optional fields (`unit`) are carried through as-is. The
/// original JSON fragment of each entry is retained in `raw`.
pub(crate) fn normalize_stats(
    body: &str,
    default_source_type: &str,
    source_name: Option<&str>,
    categorize: fn(&str) -> Option<&'static str>,
) -> Result<SourceBatch, FetchError> {
    let stats: VendorStats =
        serde_json::from_str(body).map_err(|e| FetchError::MalformedPayload(e.to_string()))?;

    let source_type = stats
        .server_type
        .unwrap_or_else(|| default_source_type.to_string());
    let timestamp = stats
        .timestamp
        .as_deref()
        .and_then(parse_vendor_timestamp)
        .unwrap_or_else(Utc::now);

    let mut records = Vec::with_capacity(stats.metrics.len());
    let mut dropped = 0u32;

    for (name, fragment) in stats.metrics {
        let value = match fragment.get("value").and_then(serde_json::Value::as_f64) {
            Some(v) => v,
            None => {
                tracing::debug!(metric = %name, source = %source_type, "Dropping entry without numeric value");
                dropped += 1;
                continue;
            }
        };
        let unit = fragment
            .get("unit")
            .and_then(serde_json::Value::as_str)
            .map(|s| s.to_string());

        records.push(NormalizedMetric {
            timestamp,
            source_type: source_type.clone(),
            source_name: source_name.map(|s| s.to_string()),
            category: categorize(&name).map(|c| c.to_string()),
            name,
            value,
            unit,
            raw: Some(fragment.to_string()),
        });
    }

    Ok(SourceBatch { records, dropped })
}
