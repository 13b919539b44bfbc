#![allow(dead_code)]

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chrono::Utc;
use dialmon_common::types::NormalizedMetric;
use dialmon_server::app;
use dialmon_server::collector::Collector;
use dialmon_server::config::ServerConfig;
use dialmon_server::state::AppState;
use dialmon_source::error::FetchError;
use dialmon_source::{SourceAdapter, SourceBatch};
use dialmon_storage::store::SqliteMetricStore;
use dialmon_storage::MetricStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

pub struct TestContext {
    pub temp_dir: TempDir,
    pub state: AppState,
    pub app: axum::Router,
}

/// Adapter that serves a fixed batch, optionally failing or stalling, so
/// tests control exactly what a cycle produces.
pub struct StaticAdapter {
    pub source_type: String,
    pub records: Vec<NormalizedMetric>,
    pub dropped: u32,
    pub fail: bool,
    pub delay: Duration,
}

impl StaticAdapter {
    pub fn new(source_type: &str, records: Vec<NormalizedMetric>) -> Self {
        Self {
            source_type: source_type.to_string(),
            records,
            dropped: 0,
            fail: false,
            delay: Duration::ZERO,
        }
    }

    pub fn failing(source_type: &str) -> Self {
        Self {
            fail: true,
            ..Self::new(source_type, Vec::new())
        }
    }

    pub fn slow(source_type: &str, records: Vec<NormalizedMetric>, delay: Duration) -> Self {
        Self {
            delay,
            ..Self::new(source_type, records)
        }
    }
}

#[async_trait::async_trait]
impl SourceAdapter for StaticAdapter {
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
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        Ok(SourceBatch {
            records: self.records.clone(),
            dropped: self.dropped,
        })
    }
}

pub fn sample_metric(source_type: &str, name: &str, value: f64) -> NormalizedMetric {
    NormalizedMetric {
        timestamp: Utc::now(),
        source_type: source_type.to_string(),
        source_name: Some(format!("{source_type}-01")),
        category: None,
        name: name.to_string(),
        value,
        unit: Some("count".to_string()),
        raw: None,
    }
}

/// Store whose writes always fail, for exercising the bulk-write error path.
pub struct BrokenStore;

impl MetricStore for BrokenStore {
    fn append(
        &self,
        _records: &[NormalizedMetric],
    ) -> dialmon_storage::error::Result<usize> {
        Err(dialmon_storage::error::StoreError::Other(
            "database is locked".to_string(),
        ))
    }

    fn query(
        &self,
        _filter: &dialmon_common::types::MetricFilter,
    ) -> dialmon_storage::error::Result<Vec<dialmon_common::types::StoredMetric>> {
        Err(dialmon_storage::error::StoreError::Other(
            "database is locked".to_string(),
        ))
    }

    fn summarize(
        &self,
        _filter: &dialmon_common::types::MetricFilter,
    ) -> dialmon_storage::error::Result<dialmon_common::types::MetricsSummary> {
        Err(dialmon_storage::error::StoreError::Other(
            "database is locked".to_string(),
        ))
    }
}

pub fn build_test_context(adapters: Vec<Arc<dyn SourceAdapter>>) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    let store: Arc<dyn MetricStore> = Arc::new(SqliteMetricStore::open(
        &temp_dir.path().join("metrics.db"),
    )?);
    build_with_store(temp_dir, store, adapters)
}

pub fn build_test_context_with_store(
    store: Arc<dyn MetricStore>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
) -> Result<TestContext> {
    let temp_dir = tempfile::tempdir()?;
    build_with_store(temp_dir, store, adapters)
}

fn build_with_store(
    temp_dir: TempDir,
    store: Arc<dyn MetricStore>,
    adapters: Vec<Arc<dyn SourceAdapter>>,
) -> Result<TestContext> {
    let source_count = adapters.len();
    let collector = Arc::new(Collector::new(
        adapters,
        store.clone(),
        Duration::from_secs(5),
    ));

    let mut config = ServerConfig::default();
    config.poll.enabled = false;
    // sources are mocked; the count still feeds /health
    config.sources = (0..source_count)
        .map(|i| dialmon_server::config::SourceConfig {
            kind: "uccx".to_string(),
            name: Some(format!("mock-{i}")),
            base_url: "http://127.0.0.1:0".to_string(),
        })
        .collect();

    let state = AppState::new(collector, store, Arc::new(config));
    let app = app::build_http_app(state.clone());

    Ok(TestContext {
        temp_dir,
        state,
        app,
    })
}

pub async fn get(app: &axum::Router, uri: &str) -> (StatusCode, Value, Option<String>) {
    let req = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .expect("request should build");

    let resp = app
        .clone()
        .oneshot(req)
        .await
        .expect("request should be handled");
    let status = resp.status();
    let trace_id = resp
        .headers()
        .get("x-trace-id")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.to_string());
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice::<Value>(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).to_string()))
    };

    (status, json, trace_id)
}

pub fn assert_ok_envelope(json: &Value) {
    assert_eq!(json["err_code"], 0);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
}

pub fn assert_err_envelope(json: &Value, err_code: i32) {
    assert_eq!(json["err_code"], err_code);
    assert!(json["err_msg"].is_string());
    assert!(json.get("trace_id").is_some());
    assert!(json["data"].is_null());
}
