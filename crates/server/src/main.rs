//! Movie score HTTP server.
//!
//! Loads the trained pipeline from `MOVIEMODEL_ARTIFACTS` and refuses to
//! start if it is missing or inconsistent.

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use server::{AppState, ServerConfig, create_router};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let config = ServerConfig::from_env();
    init_tracing(config.as_ref().is_ok_and(|c| c.json_logs));
    let config = config.context("invalid server configuration")?;

    info!(
        "Starting movie score server: mode={}, artifacts={}, admin routes={}",
        config.mode,
        config.artifacts_dir.display(),
        if config.admin_token.is_some() { "enabled" } else { "disabled" }
    );

    let addr = config.bind_addr();
    let state = match AppState::load(config) {
        Ok(state) => state,
        Err(e) => {
            error!("Failed to load model artifacts: {}", e);
            error!("Train a model first: movie-score train --data <csv> --artifacts <dir>");
            std::process::exit(1);
        }
    };

    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr.as_str())
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("Server shutdown complete");
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
