use anyhow::Result;
use dialmon_server::app;
use dialmon_server::collector::Collector;
use dialmon_server::config::ServerConfig;
use dialmon_server::scheduler::PollScheduler;
use dialmon_server::state::AppState;
use dialmon_source::{build_adapter, SourceAdapter};
use dialmon_storage::store::SqliteMetricStore;
use dialmon_storage::MetricStore;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("dialmon=info".parse()?))
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/dialmon.toml".to_string());
    let config = ServerConfig::load(Path::new(&config_path))?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.path,
        sources = config.sources.len(),
        poll_enabled = config.poll.enabled,
        "dialmon-server starting"
    );

    let store: Arc<dyn MetricStore> =
        Arc::new(SqliteMetricStore::open(Path::new(&config.database.path))?);

    let fetch_timeout = Duration::from_secs(config.poll.request_timeout_secs);
    let mut adapters: Vec<Arc<dyn SourceAdapter>> = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        let adapter = build_adapter(
            &source.kind,
            &source.base_url,
            source.name.as_deref(),
            fetch_timeout,
        )
        .map_err(|e| anyhow::anyhow!("invalid source '{}': {}", source.kind, e))?;
        tracing::info!(kind = %source.kind, base_url = %source.base_url, "Source registered");
        adapters.push(adapter);
    }
    if adapters.is_empty() {
        tracing::warn!("No sources configured; collection cycles will store nothing");
    }

    let collector = Arc::new(Collector::new(adapters, store.clone(), fetch_timeout));
    let config = Arc::new(config);
    let state = AppState::new(collector.clone(), store, config.clone());

    let poll_handle = if config.poll.enabled {
        let scheduler = PollScheduler::new(collector, config.poll.interval_secs);
        Some(tokio::spawn(async move {
            scheduler.run().await;
        }))
    } else {
        tracing::info!("Background polling disabled");
        None
    };

    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state);
    let listener = tokio::net::TcpListener::bind(http_addr).await?;

    tracing::info!(http = %http_addr, "Server started");

    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        });
    if let Err(e) = server.await {
        tracing::error!(error = %e, "HTTP server error");
    }

    if let Some(h) = poll_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
