// =============================================================================
// Runtime Configuration — engine and feed settings loaded from JSON
// =============================================================================
//
// Every tunable lives here so alternative tunings can be tried without a
// rebuild. All fields carry `#[serde(default)]` so that adding new fields
// never breaks loading an older config file. Environment variables override
// the feed endpoint after loading.
//
// =============================================================================

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ensemble::EnsembleConfig;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_min_history() -> usize {
    20
}

fn default_max_history() -> usize {
    1000
}

fn default_streak_break_threshold() -> usize {
    4
}

fn default_balance_window() -> usize {
    25
}

fn default_balance_threshold() -> f64 {
    0.45
}

fn default_balance_scale() -> f64 {
    0.9
}

fn default_score_window() -> usize {
    15
}

fn default_score_band() -> f64 {
    2.3
}

fn default_score_spread() -> f64 {
    7.5
}

fn default_volatility_window() -> usize {
    20
}

fn default_pattern_window() -> usize {
    100
}

fn default_pattern_lengths() -> Vec<usize> {
    vec![4]
}

fn default_pattern_min_occurrences() -> u32 {
    2
}

fn default_feed_url() -> String {
    "wss://websocket.azhkthg1.net/websocket".to_string()
}

fn default_feed_origin() -> String {
    "https://play.sun.win".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/126.0.0.0 Safari/537.36"
        .to_string()
}

fn default_handshake() -> Vec<serde_json::Value> {
    vec![
        serde_json::json!([6, "MiniGame", "taixiuPlugin", { "cmd": 1005 }]),
        serde_json::json!([6, "MiniGame", "lobbyPlugin", { "cmd": 10001 }]),
    ]
}

fn default_handshake_spacing_ms() -> u64 {
    600
}

fn default_ping_interval_secs() -> u64 {
    15
}

fn default_reconnect_delay_ms() -> u64 {
    2500
}

// =============================================================================
// EngineConfig
// =============================================================================

/// Windows, thresholds and bounds of the prediction engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Rounds required before the session leaves WARMING_UP.
    #[serde(default = "default_min_history")]
    pub min_history: usize,

    /// Capacity of the round store; oldest rounds are evicted beyond it.
    #[serde(default = "default_max_history")]
    pub max_history: usize,

    /// Tail run length at which the streak analyzer switches to BREAK.
    #[serde(default = "default_streak_break_threshold")]
    pub streak_break_threshold: usize,

    #[serde(default = "default_balance_window")]
    pub balance_window: usize,

    /// Minimum |imbalance| (in [0, 1]) for the balance analyzer to fire.
    #[serde(default = "default_balance_threshold")]
    pub balance_threshold: f64,

    #[serde(default = "default_balance_scale")]
    pub balance_scale: f64,

    #[serde(default = "default_score_window")]
    pub score_window: usize,

    /// Distance of the mean total from 10.5 needed to fire.
    #[serde(default = "default_score_band")]
    pub score_band: f64,

    /// Distance from 10.5 that maps to confidence 1.0.
    #[serde(default = "default_score_spread")]
    pub score_spread: f64,

    #[serde(default = "default_volatility_window")]
    pub volatility_window: usize,

    #[serde(default = "default_pattern_window")]
    pub pattern_window: usize,

    /// Pattern lengths to try, longest first.
    #[serde(default = "default_pattern_lengths")]
    pub pattern_lengths: Vec<usize>,

    #[serde(default = "default_pattern_min_occurrences")]
    pub pattern_min_occurrences: u32,

    /// Publish the opposite of the engine's call (contrarian mode).
    #[serde(default)]
    pub invert_output: bool,

    #[serde(default)]
    pub ensemble: EnsembleConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_history: default_min_history(),
            max_history: default_max_history(),
            streak_break_threshold: default_streak_break_threshold(),
            balance_window: default_balance_window(),
            balance_threshold: default_balance_threshold(),
            balance_scale: default_balance_scale(),
            score_window: default_score_window(),
            score_band: default_score_band(),
            score_spread: default_score_spread(),
            volatility_window: default_volatility_window(),
            pattern_window: default_pattern_window(),
            pattern_lengths: default_pattern_lengths(),
            pattern_min_occurrences: default_pattern_min_occurrences(),
            invert_output: false,
            ensemble: EnsembleConfig::default(),
        }
    }
}

// =============================================================================
// FeedConfig
// =============================================================================

/// Connection settings of the game feed adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// WebSocket endpoint, usually including an access token query string.
    #[serde(default = "default_feed_url")]
    pub url: String,

    #[serde(default = "default_feed_origin")]
    pub origin: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Frames sent in order right after connecting (login, subscriptions).
    #[serde(default = "default_handshake")]
    pub handshake: Vec<serde_json::Value>,

    #[serde(default = "default_handshake_spacing_ms")]
    pub handshake_spacing_ms: u64,

    #[serde(default = "default_ping_interval_secs")]
    pub ping_interval_secs: u64,

    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: default_feed_url(),
            origin: default_feed_origin(),
            user_agent: default_user_agent(),
            handshake: default_handshake(),
            handshake_spacing_ms: default_handshake_spacing_ms(),
            ping_interval_secs: default_ping_interval_secs(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
        }
    }
}

// =============================================================================
// RuntimeConfig
// =============================================================================

/// Top-level configuration.
///
/// Every field has a serde default so that older JSON files missing new fields
/// will still deserialise correctly.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub feed: FeedConfig,
}

impl RuntimeConfig {
    /// Load configuration from a JSON file at `path`.
    ///
    /// If the file does not exist, returns an error so the caller can fall
    /// back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read runtime config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse runtime config from {}", path.display()))?;

        info!(
            path = %path.display(),
            min_history = config.engine.min_history,
            max_history = config.engine.max_history,
            invert_output = config.engine.invert_output,
            "runtime config loaded"
        );

        Ok(config)
    }

    /// Apply `FEED_URL` / `FEED_ORIGIN` style overrides through a lookup
    /// function (the process environment in `main`).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FEED_URL").filter(|v| !v.trim().is_empty()) {
            self.feed.url = url.trim().to_string();
        }
        if let Some(origin) = lookup("FEED_ORIGIN").filter(|v| !v.trim().is_empty()) {
            self.feed.origin = origin.trim().to_string();
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.engine.min_history, 20);
        assert_eq!(cfg.engine.max_history, 1000);
        assert_eq!(cfg.engine.streak_break_threshold, 4);
        assert_eq!(cfg.engine.pattern_lengths, vec![4]);
        assert!(!cfg.engine.invert_output);
        assert!((cfg.engine.balance_threshold - 0.45).abs() < f64::EPSILON);
        assert_eq!(cfg.feed.handshake.len(), 2);
        assert_eq!(cfg.feed.reconnect_delay_ms, 2500);
    }

    #[test]
    fn deserialise_empty_json_uses_defaults() {
        let cfg: RuntimeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn deserialise_partial_json_fills_defaults() {
        let json = r#"{ "engine": { "min_history": 5, "invert_output": true }, "feed": { "ping_interval_secs": 30 } }"#;
        let cfg: RuntimeConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.engine.min_history, 5);
        assert!(cfg.engine.invert_output);
        assert_eq!(cfg.engine.max_history, 1000);
        assert_eq!(cfg.feed.ping_interval_secs, 30);
        assert_eq!(cfg.feed.handshake_spacing_ms, 600);
    }

    #[test]
    fn overrides_replace_feed_endpoint() {
        let mut cfg = RuntimeConfig::default();
        cfg.apply_overrides(|key| match key {
            "FEED_URL" => Some(" wss://example.test/ws?token=abc ".to_string()),
            "FEED_ORIGIN" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(cfg.feed.url, "wss://example.test/ws?token=abc");
        assert_eq!(cfg.feed.origin, "https://play.sun.win");
    }

    #[test]
    fn load_missing_file_is_error() {
        assert!(RuntimeConfig::load("/nonexistent/hilo/runtime_config.json").is_err());
    }
}
