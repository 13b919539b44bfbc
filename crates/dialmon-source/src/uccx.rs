//! Adapter for the UCCX (Unified Contact Center Express) stats endpoint.

use crate::error::Result;
use crate::vendor::normalize_stats;
use crate::{build_client, fetch_body, SourceAdapter, SourceBatch};
use std::time::Duration;

const STATS_PATH: &str = "/api/uccx/stats";

pub struct UccxAdapter {
    base_url: String,
    source_name: Option<String>,
    client: reqwest::Client,
}

impl UccxAdapter {
    pub fn new(base_url: &str, source_name: Option<&str>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            source_name: source_name.map(|s| s.to_string()),
            client: build_client(timeout)?,
        })
    }
}

/// Contact-center KPIs group into agent, queue, and service-quality buckets.
fn categorize(metric_name: &str) -> Option<&'static str> {
    match metric_name {
        "active_agents" => Some("agents"),
        "calls_in_queue" | "abandoned_calls" => Some("queue"),
        "avg_handle_time" | "service_level_percent" => Some("service"),
        _ => None,
    }
}

#[async_trait::async_trait]
impl SourceAdapter for UccxAdapter {
    fn source_type(&self) -> &str {
        "uccx"
    }

    fn source_name(&self) -> Option<&str> {
        self.source_name.as_deref()
    }

    async fn fetch(&self) -> Result<SourceBatch> {
        let url = format!("{}{STATS_PATH}", self.base_url);
        tracing::debug!(url = %url, "Fetching UCCX stats");
        let body = fetch_body(&self.client, &url).await?;
        normalize_stats(&body, "uccx", self.source_name.as_deref(), categorize)
    }
}
