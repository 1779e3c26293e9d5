use std::io::IsTerminal;
use std::sync::Arc;

use anyhow::Context;
use otell_core::config::{BackendKind, Config};
use otell_store::{MemoryBackend, RedisBackend, Store};
use tracing_subscriber::EnvFilter;

fn init_tracing(rust_log: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(rust_log).unwrap_or_else(|_| EnvFilter::from_default_env()))
        .with_target(false)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::from_env().context("load config from env")?;
    init_tracing(&cfg.rust_log);

    let store = build_store(&cfg).await?;
    store.ping().await.context("backend not reachable at startup")?;
    tracing::info!(addr = %cfg.listen_addr, backend = ?cfg.backend_kind, "starting otell collector");

    let app = otell_ingest::router(store);
    let listener = tokio::net::TcpListener::bind(cfg.listen_addr)
        .await
        .with_context(|| format!("bind {}", cfg.listen_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

async fn build_store(cfg: &Config) -> anyhow::Result<Store> {
    let backend: Arc<dyn otell_store::KvBackend> = match cfg.backend_kind {
        BackendKind::Redis => Arc::new(
            RedisBackend::connect(&cfg.backend_host, cfg.backend_port)
                .await
                .context("connect to redis backend")?,
        ),
        BackendKind::Memory => Arc::new(MemoryBackend::new()),
    };
    Ok(Store::new(backend, cfg.retention_ttl, cfg.max_metric_cardinality))
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("received ctrl-c, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use otell_store::MemoryBackend;
    use otell_testkit::sample_trace_payload;
    use tower::ServiceExt;

    use super::*;

    #[tokio::test]
    async fn router_serves_ingested_trace() {
        let store = Store::new(Arc::new(MemoryBackend::new()), Duration::from_secs(60), 100);
        let app = otell_ingest::router(store);

        let body = sample_trace_payload("abc123");
        let response = app
            .clone()
            .oneshot(
                axum::http::Request::post("/v1/traces")
                    .header("content-type", "application/json")
                    .body(axum::body::Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);

        let response = app
            .oneshot(
                axum::http::Request::get("/api/traces/abc123")
                    .body(axum::body::Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
