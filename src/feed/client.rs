// =============================================================================
// Feed Client — game WebSocket connection
// =============================================================================
//
// Connects with browser-like Origin / User-Agent headers, sends the
// handshake frames (login, plugin subscriptions) spaced apart, pings on a
// fixed interval and feeds every finalized round into the session.
//
// Runs until the stream disconnects or an error occurs, then returns so that
// the caller (main.rs) can handle reconnection.
// =============================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use super::message::{parse_frame, FeedEvent};
use crate::app_state::AppState;
use crate::runtime_config::FeedConfig;

/// Connect to the game feed and process frames until it drops.
pub async fn run_feed_stream(config: &FeedConfig, state: &Arc<AppState>) -> Result<()> {
    let mut request = config
        .url
        .as_str()
        .into_client_request()
        .context("invalid feed URL")?;
    let headers = request.headers_mut();
    headers.insert(
        "Origin",
        HeaderValue::from_str(&config.origin).context("invalid Origin header")?,
    );
    headers.insert(
        "User-Agent",
        HeaderValue::from_str(&config.user_agent).context("invalid User-Agent header")?,
    );

    info!(host = ?request.uri().host(), "connecting to game feed");
    let (ws_stream, _response) = connect_async(request)
        .await
        .context("failed to connect to game feed")?;

    info!("game feed connected");
    state.set_feed_connected(true);
    let result = stream_frames(config, state, ws_stream).await;
    state.set_feed_connected(false);
    result
}

async fn stream_frames<S>(
    config: &FeedConfig,
    state: &Arc<AppState>,
    ws_stream: tokio_tungstenite::WebSocketStream<S>,
) -> Result<()>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();

    for (i, frame) in config.handshake.iter().enumerate() {
        if i > 0 {
            sleep(Duration::from_millis(config.handshake_spacing_ms)).await;
        }
        write
            .send(Message::Text(frame.to_string()))
            .await
            .context("failed to send handshake frame")?;
        debug!(index = i, "handshake frame sent");
    }

    let mut ping = interval(Duration::from_secs(config.ping_interval_secs.max(1)));
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ping.tick().await;

    loop {
        tokio::select! {
            _ = ping.tick() => {
                if let Err(e) = write.send(Message::Ping(Vec::new())).await {
                    error!(error = %e, "game feed ping failed");
                    return Err(e.into());
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => dispatch(state, parse_frame(&text)),
                    Some(Ok(Message::Close(frame))) => {
                        warn!(frame = ?frame, "game feed closed by server");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        error!(error = %e, "game feed read error");
                        return Err(e.into());
                    }
                    None => {
                        warn!("game feed stream ended");
                        return Ok(());
                    }
                }
            }
        }
    }
}

/// Apply one parsed feed event to the application state.
pub fn dispatch(state: &AppState, event: FeedEvent) {
    match event {
        FeedEvent::SessionStarted { session } => {
            debug!(session, "new game session");
            state.note_session_started(session);
        }
        FeedEvent::RoundFinalized { dice, session } => {
            // `apply_round` already pushed the error to the dashboard ring.
            if let Err(e) = state.apply_round(dice, session) {
                debug!(error = %e, "Finalized round rejected");
            }
        }
        FeedEvent::Ignored => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime_config::RuntimeConfig;

    #[test]
    fn test_dispatch_session_then_round() {
        let state = AppState::new(RuntimeConfig::default());
        dispatch(&state, parse_frame(r#"[5,{"cmd":1008,"sid":501}]"#));
        dispatch(
            &state,
            parse_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":2,"d2":4,"d3":6}]"#),
        );
        let history = state.history_newest_first();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total, 12);
        assert_eq!(history[0].session, Some(501));
    }

    #[test]
    fn test_dispatch_malformed_round_records_error() {
        let state = AppState::new(RuntimeConfig::default());
        dispatch(
            &state,
            parse_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":2,"d2":40,"d3":6}]"#),
        );
        assert!(state.history_newest_first().is_empty());
        assert_eq!(state.recent_errors.read().len(), 1);
    }

    #[test]
    fn test_dispatch_keeps_going_after_rejected_round() {
        let state = AppState::new(RuntimeConfig::default());
        dispatch(&state, parse_frame(r#"[5,{"cmd":1008,"sid":77}]"#));
        dispatch(
            &state,
            parse_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":0,"d2":4,"d3":6}]"#),
        );
        dispatch(
            &state,
            parse_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":1,"d2":1,"d3":1}]"#),
        );
        let history = state.history_newest_first();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].total, 3);
        assert_eq!(history[0].session, None);
        assert_eq!(state.recent_errors.read().len(), 1);
    }

    #[test]
    fn test_dispatch_ignored_changes_nothing() {
        let state = AppState::new(RuntimeConfig::default());
        let v0 = state.current_state_version();
        dispatch(&state, FeedEvent::Ignored);
        assert_eq!(state.current_state_version(), v0);
    }

    #[tokio::test]
    async fn test_unreachable_feed_returns_error() {
        let state = Arc::new(AppState::new(RuntimeConfig::default()));
        let config = FeedConfig {
            url: "ws://127.0.0.1:1/websocket".to_string(),
            ..FeedConfig::default()
        };
        assert!(run_feed_stream(&config, &state).await.is_err());
        assert!(!state.is_feed_connected());
    }
}
