use crate::error::{Result, StoreError};
use crate::MetricStore;
use chrono::DateTime;
use dialmon_common::types::{
    MetricFilter, MetricSummaryGroup, MetricsSummary, NormalizedMetric, StoredMetric,
};
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS telephony_metrics (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp INTEGER NOT NULL DEFAULT (CAST(strftime('%s','now') AS INTEGER) * 1000),
    server_type TEXT NOT NULL,
    server_name TEXT,
    metric_category TEXT,
    metric_name TEXT NOT NULL,
    metric_value REAL NOT NULL,
    unit TEXT,
    raw_data TEXT
);
CREATE INDEX IF NOT EXISTS idx_metrics_time
    ON telephony_metrics(timestamp DESC);
CREATE INDEX IF NOT EXISTS idx_metrics_server_time
    ON telephony_metrics(server_type, timestamp DESC);
";

/// SQLite-backed [`MetricStore`]. One database file, WAL journal mode.
pub struct SqliteMetricStore {
    conn: Mutex<Connection>,
}

impl SqliteMetricStore {
    /// Opens (or creates) the database at `path` and applies the schema.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Other(format!("cannot create data dir: {e}")))?;
        }
        let conn = Connection::open(path).map_err(|source| StoreError::Open {
            path: path.display().to_string(),
            source,
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "Metric store opened");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// In-memory store for tests and local experiments.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Lock the connection, recovering from a poisoned Mutex if necessary.
    fn lock_conn(&self) -> MutexGuard<'_, Connection> {
        self.conn
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Builds the shared `WHERE` clause for `query`/`summarize` from a filter.
fn filter_clause(filter: &MetricFilter) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
    let mut sql = String::from(" WHERE 1=1");
    let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(ref server_type) = filter.source_type {
        params.push(Box::new(server_type.clone()));
        sql.push_str(&format!(" AND server_type = ?{}", params.len()));
    }
    if let Some(since) = filter.since {
        params.push(Box::new(since.timestamp_millis()));
        sql.push_str(&format!(" AND timestamp >= ?{}", params.len()));
    }

    (sql, params)
}

impl MetricStore for SqliteMetricStore {
    fn append(&self, records: &[NormalizedMetric]) -> Result<usize> {
        let conn = self.lock_conn();
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT INTO telephony_metrics
                 (timestamp, server_type, server_name, metric_category, metric_name, metric_value, unit, raw_data)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for record in records {
                stmt.execute(rusqlite::params![
                    record.timestamp.timestamp_millis(),
                    &record.source_type,
                    &record.source_name,
                    &record.category,
                    &record.name,
                    record.value,
                    &record.unit,
                    &record.raw,
                ])?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    fn query(&self, filter: &MetricFilter) -> Result<Vec<StoredMetric>> {
        let (clause, mut params) = filter_clause(filter);
        // SQLite treats a negative LIMIT as unbounded
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);
        params.push(Box::new(limit));
        let sql = format!(
            "SELECT id, timestamp, server_type, server_name, metric_category,
                    metric_name, metric_value, unit, raw_data
             FROM telephony_metrics{clause}
             ORDER BY timestamp DESC, id DESC
             LIMIT ?{}",
            params.len()
        );

        let conn = self.lock_conn();
        let mut stmt = conn.prepare_cached(&sql)?;
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            let ts_ms: i64 = row.get(1)?;
            Ok(StoredMetric {
                id: row.get(0)?,
                timestamp: DateTime::from_timestamp_millis(ts_ms).unwrap_or_default(),
                server_type: row.get(2)?,
                server_name: row.get(3)?,
                metric_category: row.get(4)?,
                metric_name: row.get(5)?,
                metric_value: row.get(6)?,
                unit: row.get(7)?,
                raw_data: row.get(8)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    fn summarize(&self, filter: &MetricFilter) -> Result<MetricsSummary> {
        let (clause, params) = filter_clause(filter);
        let conn = self.lock_conn();
        let param_refs: Vec<&dyn rusqlite::types::ToSql> =
            params.iter().map(|p| p.as_ref()).collect();

        let totals_sql = format!(
            "SELECT COUNT(*), MIN(timestamp), MAX(timestamp) FROM telephony_metrics{clause}"
        );
        let mut stmt = conn.prepare_cached(&totals_sql)?;
        let (total, oldest_ms, newest_ms) =
            stmt.query_row(param_refs.as_slice(), |row| {
                let total: u64 = row.get(0)?;
                let oldest: Option<i64> = row.get(1)?;
                let newest: Option<i64> = row.get(2)?;
                Ok((total, oldest, newest))
            })?;

        let groups_sql = format!(
            "SELECT server_type, metric_name, COUNT(*), MIN(metric_value),
                    MAX(metric_value), AVG(metric_value)
             FROM telephony_metrics{clause}
             GROUP BY server_type, metric_name
             ORDER BY server_type, metric_name"
        );
        let mut stmt = conn.prepare_cached(&groups_sql)?;
        let rows = stmt.query_map(param_refs.as_slice(), |row| {
            Ok(MetricSummaryGroup {
                server_type: row.get(0)?,
                metric_name: row.get(1)?,
                count: row.get(2)?,
                min: row.get(3)?,
                max: row.get(4)?,
                avg: row.get(5)?,
            })
        })?;

        let mut groups = Vec::new();
        for row in rows {
            groups.push(row?);
        }

        Ok(MetricsSummary {
            total,
            oldest: oldest_ms.and_then(DateTime::from_timestamp_millis),
            newest: newest_ms.and_then(DateTime::from_timestamp_millis),
            groups,
        })
    }
}
