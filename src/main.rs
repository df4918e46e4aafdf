use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use api_stat::config::Config;
use api_stat::{host, server, stat, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Configuration & logging ───────────────────────────────
    let config = Config::from_env().context("invalid configuration")?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(hostname = host::hostname(), ?config, "starting api-stat server");

    // ── 2. Build shared state ────────────────────────────────────
    let state = Arc::new(AppState::new(config.clone()));

    // ── 3. Registry callbacks & background collection ────────────
    state
        .registry
        .register_callback(stat::current_chunks_count(state.brs.clone()));
    let brs = state.brs.clone();
    state.registry.register_callback(move |_| {
        brs.purge_expired();
    });
    let collector = state.registry.spawn_collector(config.collect_interval());

    // ── 4. Build Axum router ─────────────────────────────────────
    let app = server::create_router(state);

    // ── 5. Bind & serve ──────────────────────────────────────────
    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.listen_addr))?;

    tracing::info!(addr = %config.listen_addr, "listening");
    tracing::info!("query    → /api/query?metric_id=<id>");
    tracing::info!("stats    → /api/stats, /api/stats/stream");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server exited with error")?;

    collector.abort();
    tracing::info!("shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
