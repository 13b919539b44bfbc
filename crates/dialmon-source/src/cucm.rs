//! Adapter for the CUCM (Unified Communications Manager) system stats
//! endpoint.

use crate::error::Result;
use crate::vendor::normalize_stats;
use crate::{build_client, fetch_body, SourceAdapter, SourceBatch};
use std::time::Duration;

const STATS_PATH: &str = "/api/cucm/system/stats";

pub struct CucmAdapter {
    base_url: String,
    source_name: Option<String>,
    client: reqwest::Client,
}

impl CucmAdapter {
    pub fn new(base_url: &str, source_name: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            source_name: source_name.map(|s| s.to_string()),
            client: build_client(timeout)?,
        })
    }
}

fn categorize(metric_name: &str) -> Option<&'static str> {
    match metric_name {
        "cpu_usage_percent" => Some("cpu"),
        "memory_usage_percent" => Some("memory"),
        "active_calls" | "failed_calls" | "total_call_volume" => Some("calls"),
        "registered_phones" => Some("phones"),
        _ => None,
    }
}

#[async_trait::async_trait]
impl SourceAdapter for CucmAdapter {
    fn source_type(&self) -> &str {
        "cucm"
    }

    fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        let url = format!("{}{STATS_PATH}", self.base_url);
        tracing::debug!(url = %url, "Fetching CUCM stats");
        let body = fetch_body(&self.client, &url).await?;
        normalize_stats(&body, "cucm", self.source_name.as_deref(), categorize)
    }
}
