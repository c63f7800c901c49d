// =============================================================================
// HILO Predictor — Main Entry Point
// =============================================================================
//
// Connects to the game feed, predicts HIGH/LOW for every upcoming round and
// serves the prediction state over REST and WebSocket.
// =============================================================================

// ── Module declarations ──────────────────────────────────────────────────────
mod analyzers;
mod api;
mod app_state;
mod engine;
mod ensemble;
mod feed;
mod history;
mod prediction_outcome;
mod regime;
mod runtime_config;
mod session;
mod types;

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::app_state::AppState;
use crate::runtime_config::RuntimeConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("╔══════════════════════════════════════════════════════════╗");
    info!("║        HILO Predictor — Starting Up                      ║");
    info!("╚══════════════════════════════════════════════════════════╝");

    let config_path =
        std::env::var("HILO_CONFIG").unwrap_or_else(|_| "runtime_config.json".into());
    let mut config = RuntimeConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        RuntimeConfig::default()
    });
    config.apply_overrides(|key| std::env::var(key).ok());

    info!(
        min_history = config.engine.min_history,
        max_history = config.engine.max_history,
        fallback = ?config.engine.ensemble.fallback,
        invert_output = config.engine.invert_output,
        "Prediction engine configured"
    );

    // ── 2. Build shared state ────────────────────────────────────────────
    let state = Arc::new(AppState::new(config));

    // ── 3. Game feed (reconnects forever) ────────────────────────────────
    let feed_state = state.clone();
    tokio::spawn(async move {
        let feed_config = feed_state.runtime_config.feed.clone();
        let delay = tokio::time::Duration::from_millis(feed_config.reconnect_delay_ms);
        loop {
            if let Err(e) = feed::run_feed_stream(&feed_config, &feed_state).await {
                error!(error = %e, "Game feed error");
                feed_state.push_error_with_code(
                    format!("feed: {e:#}"),
                    Some("feed_error".to_string()),
                );
            }
            warn!(delay_ms = feed_config.reconnect_delay_ms, "Game feed disconnected, reconnecting");
            tokio::time::sleep(delay).await;
        }
    });

    // ── 4. Start the API server ──────────────────────────────────────────
    let api_state = state.clone();
    let bind_addr = std::env::var("HILO_BIND_ADDR").unwrap_or_else(|_| {
        let port = std::env::var("PORT").unwrap_or_else(|_| "5000".into());
        format!("0.0.0.0:{port}")
    });

    tokio::spawn(async move {
        let app = api::rest::router(api_state);
        let listener = tokio::net::TcpListener::bind(&bind_addr)
            .await
            .expect("Failed to bind API server");
        info!(addr = %bind_addr, "API server listening");
        axum::serve(listener, app)
            .await
            .expect("API server failed");
    });

    info!("All subsystems running. Press Ctrl+C to stop.");

    // ── 5. Graceful shutdown ─────────────────────────────────────────────
    tokio::signal::ctrl_c().await?;
    warn!("Shutdown signal received, stopping");

    let counters = state.session.read().counters();
    info!(
        correct = counters.correct,
        incorrect = counters.incorrect,
        hit_rate = format!("{:.1}", counters.hit_rate_pct()),
        "HILO Predictor shut down complete."
    );
    Ok(())
}
