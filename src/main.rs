use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;

use ragline::core;
use ragline::core::config::AppPaths;
use ragline::server;
use ragline::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = Arc::new(AppPaths::from_env());
    let _log_guard =
        core::logging::init(&paths.log_dir).context("Failed to open the log directory")?;

    let state = AppState::initialize(paths).context("Failed to initialize application state")?;

    state.pipelines.startup_all().await;

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;

    println!("RAGLINE_PORT={}", addr.port());
    tracing::info!("Listening on {} with {} pipeline(s)", addr, state.pipelines.len());

    let app: Router = server::router(state.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    state.pipelines.shutdown_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
