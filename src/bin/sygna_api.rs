//! 0G-Sygna Scoring API Server
//!
//! Usage:
//!   cargo run --bin sygna_api
//!
//! Environment:
//!   PORT / SYGNA_PORT          - Server port (default: 8080)
//!   SYGNA_HOST                 - Server host (default: 0.0.0.0)
//!   SYGNA_RATE_LIMIT_PER_MINUTE
//!   SYGNA_COMPUTE_URL          - Optional compute provider for AI reasoning
//!   RUST_LOG                   - Log filter (default: info)

use sygna::api::{create_router, start_cleanup_task, AppState};
use sygna::{IntelligentRiskScorer, SygnaConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .compact()
        .init();

    let config = SygnaConfig::from_env()?;
    let scorer = IntelligentRiskScorer::from_config(&config.compute);

    let state = Arc::new(AppState::new(scorer, &config.api));
    let cleanup = start_cleanup_task(state.clone());
    info!("🧹 Background cleanup task started");

    let app = create_router(state.clone());

    let addr: SocketAddr = format!("{}:{}", config.api.host, config.api.port).parse()?;

    info!("🚀 0G-Sygna API starting on http://{}", addr);
    info!("Endpoints:");
    info!("  POST /v1/risk/score          - Score six risk factors");
    info!("  POST /v1/risk/metadata       - Generate and store an audit record");
    info!("  GET  /v1/risk/metadata/:id   - Fetch a stored record");
    info!("  GET  /v1/stats               - Assessment statistics");
    info!("  GET  /v1/health              - Health check");

    let listener = TcpListener::bind(addr).await?;

    let shutdown_signal = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("⚠️ Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("🛑 Shutdown signal received, cleaning up...");
    cleanup.abort();
    println!("{}", state.telemetry.stats().summary());
    info!("👋 0G-Sygna API shutdown complete");

    Ok(())
}
