// =============================================================================
// Central Application State — HILO Prediction Service
// =============================================================================
//
// The single source of truth for the service. The feed task mutates the
// prediction session; API handlers and the WebSocket push loop read
// snapshots.
//
// Thread safety:
//   - Atomic counters for lock-free version tracking.
//   - parking_lot::RwLock around the session and every shared collection.
//   - The session write lock is held for exactly one cycle per round.
// =============================================================================

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::warn;

use crate::ensemble::PredictionRecord;
use crate::prediction_outcome::PredictionOutcome;
use crate::runtime_config::RuntimeConfig;
use crate::session::{CycleReport, PredictionSession, SessionPhase};
use crate::types::{Outcome, RoundError, RoundRecord};

// =============================================================================
// Error Record
// =============================================================================

/// A recorded error event for the error log.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorRecord {
    /// Human-readable error message.
    pub message: String,
    /// Optional machine-readable error code (e.g. "malformed_round").
    pub code: Option<String>,
    /// ISO 8601 timestamp.
    pub at: String,
}

// =============================================================================
// AppState
// =============================================================================

/// Maximum number of recent errors to retain.
const MAX_RECENT_ERRORS: usize = 50;
/// Maximum number of resolved predictions to retain.
const MAX_RECENT_PREDICTIONS: usize = 100;
/// Length of the outcome pattern string in the snapshot.
const PATTERN_LENGTH: usize = 50;

/// Central application state shared across all async tasks via `Arc<AppState>`.
pub struct AppState {
    // ── Version tracking ────────────────────────────────────────────────
    /// Monotonically increasing version counter. Incremented on every
    /// meaningful state mutation. The WebSocket feed uses this to detect
    /// changes and push updates.
    pub state_version: AtomicU64,

    /// WebSocket message sequence number (incremented per message sent).
    pub ws_sequence_number: AtomicU64,

    // ── Configuration ───────────────────────────────────────────────────
    pub runtime_config: RuntimeConfig,

    // ── Prediction ──────────────────────────────────────────────────────
    pub session: RwLock<PredictionSession>,

    // ── Prediction Audit Trail ──────────────────────────────────────────
    pub recent_predictions: RwLock<VecDeque<PredictionOutcome>>,

    // ── Error Log ───────────────────────────────────────────────────────
    pub recent_errors: RwLock<VecDeque<ErrorRecord>>,

    // ── Feed Status ─────────────────────────────────────────────────────
    pub feed_connected: AtomicBool,
    /// Session id announced by a session-start frame and not yet consumed
    /// by a finalized round.
    pub current_feed_session: RwLock<Option<u64>>,
    pub last_round_at: RwLock<Option<std::time::Instant>>,

    // ── Timing ──────────────────────────────────────────────────────────
    /// Instant when the service was started. Used for uptime calculations.
    pub start_time: std::time::Instant,
}

impl AppState {
    /// Construct a new `AppState` from the given runtime configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        let session = PredictionSession::new(config.engine.clone());
        Self::with_session(config, session)
    }

    /// Construct around an already-built session (e.g. with an injected
    /// fallback strategy).
    pub fn with_session(config: RuntimeConfig, session: PredictionSession) -> Self {
        Self {
            state_version: AtomicU64::new(1),
            ws_sequence_number: AtomicU64::new(0),
            runtime_config: config,
            session: RwLock::new(session),
            recent_predictions: RwLock::new(VecDeque::with_capacity(MAX_RECENT_PREDICTIONS)),
            recent_errors: RwLock::new(VecDeque::with_capacity(MAX_RECENT_ERRORS)),
            feed_connected: AtomicBool::new(false),
            current_feed_session: RwLock::new(None),
            last_round_at: RwLock::new(None),
            start_time: std::time::Instant::now(),
        }
    }

    // ── Version Management ──────────────────────────────────────────────

    /// Atomically increment the state version. Call this after every
    /// meaningful mutation to signal WebSocket clients that fresh data is
    /// available.
    pub fn increment_version(&self) -> u64 {
        self.state_version.fetch_add(1, Ordering::SeqCst)
    }

    /// Read the current state version without modifying it.
    pub fn current_state_version(&self) -> u64 {
        self.state_version.load(Ordering::SeqCst)
    }

    // ── Error Logging ───────────────────────────────────────────────────

    /// Record an error with an optional machine-readable code. The ring
    /// buffer is capped at [`MAX_RECENT_ERRORS`]; oldest entries are evicted
    /// when the limit is reached.
    pub fn push_error_with_code(&self, msg: String, code: Option<String>) {
        let record = ErrorRecord {
            message: msg,
            code,
            at: Utc::now().to_rfc3339(),
        };

        let mut errors = self.recent_errors.write();
        errors.push_back(record);
        while errors.len() > MAX_RECENT_ERRORS {
            errors.pop_front();
        }
        drop(errors);

        self.increment_version();
    }

    // ── Feed Events ─────────────────────────────────────────────────────

    pub fn set_feed_connected(&self, connected: bool) {
        let was = self.feed_connected.swap(connected, Ordering::SeqCst);
        if was != connected {
            self.increment_version();
        }
    }

    pub fn is_feed_connected(&self) -> bool {
        self.feed_connected.load(Ordering::SeqCst)
    }

    /// A new game session was announced by the feed. The id is attributed
    /// to the next finalized round only.
    pub fn note_session_started(&self, session: u64) {
        *self.current_feed_session.write() = Some(session);
    }

    /// Feed one finalized round through the session. Malformed dice are
    /// logged and recorded in the error ring; the session is untouched.
    ///
    /// Every round frame consumes the announced session id, so a missed
    /// announcement leaves the next round without an id instead of reusing
    /// the previous one.
    pub fn apply_round(
        &self,
        dice: [Option<i64>; 3],
        session: Option<u64>,
    ) -> Result<CycleReport, RoundError> {
        let announced = self.current_feed_session.write().take();
        let session = session.or(announced);

        let result = self.session.write().ingest_dice(dice, session);
        let report = match result {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, session = ?session, "Rejected malformed round");
                self.push_error_with_code(
                    format!("malformed round (session {session:?}): {e}"),
                    Some("malformed_round".to_string()),
                );
                return Err(e);
            }
        };

        if let Some(resolution) = &report.resolution {
            let mut recent = self.recent_predictions.write();
            recent.push_back(PredictionOutcome::from_resolution(resolution));
            while recent.len() > MAX_RECENT_PREDICTIONS {
                recent.pop_front();
            }
        }
        *self.last_round_at.write() = Some(std::time::Instant::now());
        self.increment_version();

        Ok(report)
    }

    /// Clear history, counters and the audit trail.
    pub fn reset(&self) {
        self.session.write().reset();
        self.recent_predictions.write().clear();
        self.increment_version();
    }

    // ── Snapshot Builder ────────────────────────────────────────────────

    /// Build a complete, serialisable snapshot of the prediction state.
    ///
    /// This is the payload of `GET /api/v1/state` and the WebSocket push
    /// feed.
    pub fn build_snapshot(&self) -> PredictionSnapshot {
        let now = Utc::now();
        let session = self.session.read();
        let counters = session.counters();
        let history = session.history();

        let last_round = history.latest().map(|r| LastRound {
            session: r.session,
            dice: r.dice,
            total: r.total,
            outcome: r.outcome,
        });

        let last_round_age_s = self
            .last_round_at
            .read()
            .map(|at| at.elapsed().as_secs());

        let errors: Vec<ErrorRecord> = self.recent_errors.read().iter().cloned().collect();

        PredictionSnapshot {
            state_version: self.current_state_version(),
            server_time: now.timestamp_millis(),
            prediction: session.current().clone(),
            accuracy: AccuracySnapshot {
                correct: counters.correct,
                incorrect: counters.incorrect,
                total: counters.total(),
                hit_rate_pct: counters.hit_rate_pct(),
            },
            last_round,
            phase: session.phase(),
            rounds_analyzed: history.size(),
            max_rounds: history.capacity(),
            pattern: history.outcome_string(PATTERN_LENGTH),
            feed: FeedStatus {
                connected: self.is_feed_connected(),
                current_session: *self.current_feed_session.read(),
                last_round_age_s,
            },
            recent_errors: if errors.is_empty() { None } else { Some(errors) },
        }
    }

    /// Full history, newest first.
    pub fn history_newest_first(&self) -> Vec<RoundRecord> {
        self.session.read().history().iter().rev().copied().collect()
    }

    /// Resolved predictions, newest first.
    pub fn recent_predictions(&self) -> Vec<PredictionOutcome> {
        self.recent_predictions.read().iter().rev().cloned().collect()
    }
}

// =============================================================================
// Snapshot types
// =============================================================================

/// Full prediction state sent to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionSnapshot {
    pub state_version: u64,
    pub server_time: i64,
    pub prediction: PredictionRecord,
    pub accuracy: AccuracySnapshot,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_round: Option<LastRound>,

    pub phase: SessionPhase,
    pub rounds_analyzed: usize,
    pub max_rounds: usize,
    /// Chronological outcome codes of the most recent rounds (T = HIGH, X = LOW).
    pub pattern: String,
    pub feed: FeedStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_errors: Option<Vec<ErrorRecord>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AccuracySnapshot {
    pub correct: u64,
    pub incorrect: u64,
    pub total: u64,
    pub hit_rate_pct: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LastRound {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice: Option<[u8; 3]>,
    pub total: u8,
    pub outcome: Outcome,
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedStatus {
    pub connected: bool,
    pub current_session: Option<u64>,
    pub last_round_age_s: Option<u64>,
}
