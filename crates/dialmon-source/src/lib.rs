//! Source adapters for the dialmon collection pipeline.
//!
//! Each [`SourceAdapter`] implementation owns exactly one vendor endpoint
//! and translates its payload shape into [`NormalizedMetric`] records. A
//! fetch failure is typed ([`error::FetchError`]) and scoped to that source
//! for that cycle; it never aborts the other adapters.

pub mod cucm;
pub mod error;
pub mod uccx;
mod vendor;

use dialmon_common::types::NormalizedMetric;
use std::sync::Arc;
use std::time::Duration;

/// Records produced by one adapter fetch, plus the count of vendor entries
/// dropped for missing required fields.
#[derive(Debug, Default)]
pub struct SourceBatch {
    pub records: Vec<NormalizedMetric>,
    pub dropped: u32,
}

/// A vendor metrics source polled by the collector.
///
/// Implementations are registered once at startup and called at each
/// collection cycle, possibly concurrently, so the trait requires
/// `Send + Sync`.
#[async_trait::async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Source type tag stamped on every record (e.g. `"uccx"`, `"cucm"`).
    fn source_type(&self) -> &str;

    /// Configured server instance name, if any.
    fn source_name(&self) -> Option<&str>;

    /// Fetches and normalizes the current metrics from the vendor endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`error::FetchError`] on network failure, timeout, non-2xx
    /// status, or an unparseable body. A partial payload (entries missing
    /// optional or required fields) is not an error; invalid entries are
    /// dropped and counted in [`SourceBatch::dropped`].
    async fn fetch(&self) -> error::Result<SourceBatch>;
}

/// Builds a source adapter from its configured kind.
///
/// # Errors
///
/// Returns [`error::FetchError::UnsupportedSource`] if `kind` is not
/// `"uccx"` or `"cucm"`, and propagates client construction failures.
pub fn build_adapter(
    kind: &str,
    base_url: &str,
    name: Option<&str>,
    timeout: Duration,
) -> error::Result<Arc<dyn SourceAdapter>> {
    match kind {
        "uccx" => Ok(Arc::new(uccx::UccxAdapter::new(base_url, name, timeout)?)),
        "cucm" => Ok(Arc::new(cucm::CucmAdapter::new(base_url, name, timeout)?)),
        _ => Err(error::FetchError::UnsupportedSource(kind.to_string())),
    }
}

/// Shared reqwest client construction for the HTTP-polling adapters.
fn build_client(timeout: Duration) -> error::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .use_rustls_tls()
        .timeout(timeout)
        .build()?;
    Ok(client)
}

/// Performs the GET + status check + body read common to both adapters.
async fn fetch_body(client: &reqwest::Client, url: &str) -> error::Result<String> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(error::FetchError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(resp.text().await?)
}
