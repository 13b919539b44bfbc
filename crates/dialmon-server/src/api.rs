use crate::collector::CollectError;
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Extension, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use dialmon_common::types::{CycleResult, MetricFilter, MetricsSummary, StoredMetric};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::{IntoParams, ToSchema};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Default and maximum row counts for `/metrics/recent`.
const DEFAULT_RECENT_LIMIT: usize = 100;
const MAX_RECENT_LIMIT: usize = 1000;

/// API error response
#[derive(Serialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub err_code: i32,
    /// Error message
    pub err_msg: String,
    /// Trace ID for log correlation
    pub trace_id: String,
}

/// Unified API response envelope
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    /// Error code (0 on success)
    pub err_code: i32,
    /// Error message ("success" on success)
    pub err_msg: String,
    /// Trace ID for log correlation
    pub trace_id: String,
    /// Payload, when the endpoint returns data
    pub data: Option<T>,
}

pub fn success_response<T>(status: StatusCode, trace_id: &str, data: T) -> Response
where
    T: Serialize,
{
    (
        status,
        Json(ApiResponse {
            err_code: 0,
            err_msg: "success".to_string(),
            trace_id: trace_id.to_string(),
            data: Some(data),
        }),
    )
        .into_response()
}

fn to_custom_error_code(code: &str) -> i32 {
    match code {
        "bad_request" => 1001,
        "not_found" => 1004,
        "conflict" => 1005,
        "internal_error" => 1500,
        "storage_error" => 1501,
        _ => 1999,
    }
}

pub fn error_response(status: StatusCode, trace_id: &str, code: &str, msg: &str) -> Response {
    (
        status,
        Json(ApiResponse::<Value> {
            err_code: to_custom_error_code(code),
            err_msg: msg.to_string(),
            trace_id: trace_id.to_string(),
            data: None,
        }),
    )
        .into_response()
}

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(health))
        .routes(routes!(collect))
        .routes(routes!(recent_metrics))
        .routes(routes!(metrics_summary))
}

#[derive(Serialize, ToSchema)]
struct HealthResponse {
    /// Always "healthy" when the service answers
    status: String,
    version: String,
    /// Seconds since process start
    uptime_secs: i64,
    /// Whether the background poll loop is configured to run
    polling_enabled: bool,
    polling_interval_secs: u64,
    /// Number of configured sources
    source_count: usize,
    /// When the most recent cycle finished, if any
    last_cycle_at: Option<DateTime<Utc>>,
    /// Whether the most recent cycle was fully clean
    last_cycle_success: Option<bool>,
    /// Records persisted over the process lifetime
    total_metrics_collected: u64,
}

/// Service health and collection status.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Service status", body = HealthResponse)
    )
)]
async fn health(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let last = state.collector.last_result();
    let response = HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: (Utc::now() - state.start_time).num_seconds(),
        polling_enabled: state.config.poll.enabled,
        polling_interval_secs: state.config.poll.interval_secs,
        source_count: state.config.sources.len(),
        last_cycle_at: last.as_ref().map(|r| r.finished_at),
        last_cycle_success: last.as_ref().map(|r| r.success()),
        total_metrics_collected: state.collector.total_stored(),
    };
    success_response(StatusCode::OK, &trace_id, response)
}

/// Trigger a collection cycle immediately.
///
/// Returns 409 if a cycle is already running, and 502 if every source was
/// fetched but the store rejected the batch.
#[utoipa::path(
    get,
    path = "/collect",
    tag = "Collection",
    responses(
        (status = 200, description = "Cycle completed", body = CycleResult),
        (status = 409, description = "A cycle is already in progress", body = ApiError),
        (status = 502, description = "Batch could not be stored", body = ApiError)
    )
)]
async fn collect(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> Response {
    match state.collector.run_cycle().await {
        Err(CollectError::CycleInFlight) => error_response(
            StatusCode::CONFLICT,
            &trace_id,
            "conflict",
            "A collection cycle is already in progress",
        ),
        Ok(result) => {
            if let Some(ref store_err) = result.store_error {
                // Per-source outcomes are still returned alongside the error
                let msg = format!("failed to store collected metrics: {store_err}");
                (
                    StatusCode::BAD_GATEWAY,
                    Json(ApiResponse {
                        err_code: to_custom_error_code("storage_error"),
                        err_msg: msg,
                        trace_id: trace_id.to_string(),
                        data: Some(result),
                    }),
                )
                    .into_response()
            } else {
                success_response(StatusCode::OK, &trace_id, result)
            }
        }
    }
}

#[derive(Deserialize, IntoParams)]
struct RecentParams {
    /// Restrict to one source type, e.g. "uccx"
    server_type: Option<String>,
    /// Only records at or after this instant (RFC 3339)
    since: Option<DateTime<Utc>>,
    /// Maximum rows returned (default 100, capped at 1000)
    limit: Option<usize>,
}

#[derive(Serialize, ToSchema)]
struct RecentMetricsResponse {
    count: usize,
    metrics: Vec<StoredMetric>,
}

/// Most recently stored metrics, newest first.
#[utoipa::path(
    get,
    path = "/metrics/recent",
    tag = "Metrics",
    params(RecentParams),
    responses(
        (status = 200, description = "Recent metric records", body = RecentMetricsResponse),
        (status = 500, description = "Store query failed", body = ApiError)
    )
)]
async fn recent_metrics(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> Response {
    // Keep malformed query strings inside the envelope instead of axum's
    // plain-text rejection
    let Query(params) = match params {
        Ok(query) => query,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &e.body_text(),
            )
        }
    };
    let limit = params
        .limit
        .unwrap_or(DEFAULT_RECENT_LIMIT)
        .min(MAX_RECENT_LIMIT);
    let filter = MetricFilter {
        source_type: params.server_type,
        since: params.since,
        limit: Some(limit),
    };

    match state.store.query(&filter) {
        Ok(metrics) => success_response(
            StatusCode::OK,
            &trace_id,
            RecentMetricsResponse {
                count: metrics.len(),
                metrics,
            },
        ),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to query recent metrics");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to query metrics",
            )
        }
    }
}

#[derive(Deserialize, IntoParams)]
struct SummaryParams {
    /// Restrict to one source type
    server_type: Option<String>,
    /// Only records at or after this instant (RFC 3339)
    since: Option<DateTime<Utc>>,
}

/// Aggregate statistics per (server_type, metric_name) group.
#[utoipa::path(
    get,
    path = "/metrics/summary",
    tag = "Metrics",
    params(SummaryParams),
    responses(
        (status = 200, description = "Aggregate metric statistics", body = MetricsSummary),
        (status = 500, description = "Store query failed", body = ApiError)
    )
)]
async fn metrics_summary(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(query) => query,
        Err(e) => {
            return error_response(
                StatusCode::BAD_REQUEST,
                &trace_id,
                "bad_request",
                &e.body_text(),
            )
        }
    };
    let filter = MetricFilter {
        source_type: params.server_type,
        since: params.since,
        limit: None,
    };

    match state.store.summarize(&filter) {
        Ok(summary) => success_response(StatusCode::OK, &trace_id, summary),
        Err(e) => {
            tracing::error!(trace_id = %trace_id.0, error = %e, "Failed to summarize metrics");
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &trace_id,
                "storage_error",
                "failed to summarize metrics",
            )
        }
    }
}
