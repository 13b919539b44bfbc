use crate::collector::Collector;
use crate::config::ServerConfig;
use chrono::{DateTime, Utc};
use dialmon_storage::MetricStore;
use std::sync::Arc;

/// Shared application state for HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub collector: Arc<Collector>,
    pub store: Arc<dyn MetricStore>,
    pub config: Arc<ServerConfig>,
    pub start_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        collector: Arc<Collector>,
        store: Arc<dyn MetricStore>,
        config: Arc<ServerConfig>,
    ) -> Self {
        Self {
            collector,
            store,
            config,
            start_time: Utc::now(),
        }
    }
}
