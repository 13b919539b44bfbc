//! Standalone mock vendor server for local development.
//!
//! Serves UCCX and CUCM shaped stats payloads with values that fluctuate
//! per request, so a locally running dialmon-server has something real to
//! poll.

use anyhow::Result;
use axum::routing::get;
use axum::{Json, Router};
use chrono::Utc;
use rand::Rng;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing_subscriber::EnvFilter;

fn metric(value: Value, unit: &str, description: &str) -> Value {
    json!({ "value": value, "unit": unit, "description": description })
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now().to_rfc3339() }))
}

async fn uccx_stats() -> Json<Value> {
    let mut rng = rand::thread_rng();
    Json(json!({
        "server_type": "uccx",
        "timestamp": Utc::now().to_rfc3339(),
        "metrics": {
            "active_agents": metric(
                json!(rng.gen_range(8..=25)),
                "count",
                "Agents currently logged in"
            ),
            "calls_in_queue": metric(
                json!(rng.gen_range(0..=12)),
                "count",
                "Calls waiting in queue"
            ),
            "abandoned_calls": metric(
                json!(rng.gen_range(0..=5)),
                "count",
                "Calls abandoned today"
            ),
            "avg_handle_time": metric(
                json!(rng.gen_range(120.0..420.0_f64)),
                "seconds",
                "Average call handle time"
            ),
            "service_level_percent": metric(
                json!(rng.gen_range(75.0..99.0_f64)),
                "percent",
                "Service level attainment"
            ),
        }
    }))
}

async fn cucm_stats() -> Json<Value> {
    let mut rng = rand::thread_rng();
    Json(json!({
        "server_type": "cucm",
        "timestamp": Utc::now().to_rfc3339(),
        "metrics": {
            "cpu_usage_percent": metric(
                json!(rng.gen_range(10.0..85.0_f64)),
                "percent",
                "CPU utilization"
            ),
            "memory_usage_percent": metric(
                json!(rng.gen_range(30.0..90.0_f64)),
                "percent",
                "Memory utilization"
            ),
            "active_calls": metric(
                json!(rng.gen_range(100..800)),
                "count",
                "Active calls on the cluster"
            ),
            "registered_phones": metric(
                json!(rng.gen_range(700..900)),
                "count",
                "Registered phone devices"
            ),
            "failed_calls": metric(
                json!(rng.gen_range(0..10)),
                "count",
                "Failed call attempts today"
            ),
            "total_call_volume": metric(
                json!(rng.gen_range(2000..6000)),
                "count",
                "Total calls handled today"
            ),
        }
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dialmon=info".parse()?))
        .init();

    let port: u16 = std::env::args()
        .nth(1)
        .map(|p| p.parse())
        .transpose()?
        .unwrap_or(8001);

    let app = Router::new()
        .route("/health", get(health))
        .route("/api/uccx/stats", get(uccx_stats))
        .route("/api/cucm/system/stats", get(cucm_stats));

    let addr: SocketAddr = format!("0.0.0.0:{port}").parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "dialmon-mock started");
    axum::serve(listener, app).await?;

    Ok(())
}
