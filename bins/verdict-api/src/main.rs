mod handlers;
mod metrics;
mod routes;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use verdict_engine::{EngineConfig, Executor};

pub struct AppState {
    pub executor: Executor,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("VERDICT_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    info!("Verdict API booting...");

    let config = EngineConfig::load(None).context("Failed to load engine configuration")?;
    info!(
        sandbox = ?config.sandbox,
        case_timeout_ms = config.case_timeout_ms,
        max_parallel_cases = config.max_parallel_cases,
        "Engine configured"
    );

    let executor = Executor::from_config(config).context("Failed to initialise sandbox")?;
    match executor.sandbox().check().await {
        Ok(version) => info!(sandbox = executor.sandbox().name(), runtime = %version, "Runtime available"),
        // The server still starts; evaluations fail with 500 until the runtime appears.
        Err(e) => warn!(sandbox = executor.sandbox().name(), error = %e, "Runtime check failed"),
    }

    let state = Arc::new(AppState { executor });
    let app = routes::build_router(state);

    let addr = std::env::var("VERDICT_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("HTTP server listening on {}", addr);
    info!("Ready to accept evaluations");

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
