// =============================================================================
// REST API Endpoints — Axum 0.7
// =============================================================================
//
// All endpoints live under `/api/v1/` and are read-only except the reset
// control.
//
// CORS is configured permissively so any dashboard origin can read the
// prediction state.
// =============================================================================

use std::sync::Arc;

use axum::{
    extract::{Json, State},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::app_state::AppState;

// =============================================================================
// Router construction
// =============================================================================

/// Build the full REST API router with CORS middleware and shared state.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/state", get(full_state))
        .route("/api/v1/history", get(history))
        .route("/api/v1/predictions", get(predictions))
        .route("/api/v1/control/reset", post(control_reset))
        // ── WebSocket (handled separately in ws module but mounted here) ─
        .route("/api/v1/ws", get(crate::api::ws::ws_handler))
        // ── Middleware & State ───────────────────────────────────────
        .layer(cors)
        .with_state(state)
}

// =============================================================================
// Health
// =============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    state_version: u64,
    server_time: i64,
    uptime_s: u64,
    feed_connected: bool,
    ws_messages_sent: u64,
}

async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let resp = HealthResponse {
        status: "ok",
        state_version: state.current_state_version(),
        server_time: chrono::Utc::now().timestamp_millis(),
        uptime_s: state.start_time.elapsed().as_secs(),
        feed_connected: state.is_feed_connected(),
        ws_messages_sent: state
            .ws_sequence_number
            .load(std::sync::atomic::Ordering::Relaxed),
    };
    Json(resp)
}

// =============================================================================
// Full prediction snapshot
// =============================================================================

async fn full_state(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.build_snapshot())
}

// =============================================================================
// History & audit trail
// =============================================================================

async fn history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.history_newest_first())
}

async fn predictions(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.recent_predictions())
}

// =============================================================================
// Control
// =============================================================================

async fn control_reset(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.reset();
    info!("Prediction state reset via API");
    Json(serde_json::json!({ "success": true, "message": "Prediction state reset" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(RuntimeConfig::default()))
    }

    #[tokio::test]
    async fn test_health_reports_ok() {
        let resp = health(State(state())).await.into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
    }

    #[tokio::test]
    async fn test_health_reports_ws_messages_sent() {
        let s = state();
        s.ws_sequence_number
            .fetch_add(3, std::sync::atomic::Ordering::Relaxed);
        let resp = health(State(s)).await.into_response();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["ws_messages_sent"], 3);
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_reset_clears_history() {
        let s = state();
        s.apply_round([Some(4), Some(4), Some(4)], Some(1)).unwrap();
        let resp = control_reset(State(s.clone())).await.into_response();
        assert_eq!(resp.status(), axum::http::StatusCode::OK);
        assert!(s.history_newest_first().is_empty());
    }

    #[test]
    fn test_router_builds() {
        let _ = router(state());
    }
}
