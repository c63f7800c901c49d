// =============================================================================
// Prediction Session — resolve, append, predict
// =============================================================================
//
// Owns the round history, the accuracy counters and the pending prediction.
// Every finalized round runs one full cycle:
//
//   1. Score the pending prediction against the actual outcome
//   2. Append the round (evicting the oldest at capacity)
//   3. Publish the prediction for the next round
//
// WARMING_UP -> READY is one-way. Malformed rounds are rejected before any
// state is touched.
// =============================================================================

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::engine::PredictionEngine;
use crate::ensemble::{FallbackStrategy, PredictionRecord};
use crate::history::RoundHistory;
use crate::runtime_config::EngineConfig;
use crate::types::{PredictedLabel, RoundError, RoundRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    WarmingUp,
    Ready,
}

/// Running tally of scored predictions. UNKNOWN calls are never scored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccuracyCounters {
    pub correct: u64,
    pub incorrect: u64,
}

impl AccuracyCounters {
    pub fn total(&self) -> u64 {
        self.correct + self.incorrect
    }

    /// Percentage of correct calls, 0 when nothing was scored yet.
    pub fn hit_rate_pct(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            n => self.correct as f64 / n as f64 * 100.0,
        }
    }
}

/// How the pending prediction fared against the round that just finalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resolution {
    pub predicted: PredictedLabel,
    pub confidence: f64,
    pub actual: RoundRecord,
    pub correct: bool,
}

/// Result of one full cycle.
#[derive(Debug, Clone)]
pub struct CycleReport {
    /// `None` when the pending prediction was UNKNOWN.
    pub resolution: Option<Resolution>,
    pub prediction: PredictionRecord,
}

pub struct PredictionSession {
    config: EngineConfig,
    engine: PredictionEngine,
    history: RoundHistory,
    counters: AccuracyCounters,
    current: PredictionRecord,
    phase: SessionPhase,
}

impl PredictionSession {
    pub fn new(config: EngineConfig) -> Self {
        let engine = PredictionEngine::new(&config);
        Self::with_engine(config, engine)
    }

    /// Build with an injected fallback strategy.
    pub fn with_fallback(config: EngineConfig, fallback: Box<dyn FallbackStrategy>) -> Self {
        let engine = PredictionEngine::with_fallback(&config, fallback);
        Self::with_engine(config, engine)
    }

    fn with_engine(config: EngineConfig, engine: PredictionEngine) -> Self {
        let history = RoundHistory::new(config.max_history);
        let current = PredictionRecord::warming_up(Self::required(&config), 0);
        Self {
            config,
            engine,
            history,
            counters: AccuracyCounters::default(),
            current,
            phase: SessionPhase::WarmingUp,
        }
    }

    /// Rounds needed before READY. A store smaller than `min_history` could
    /// never reach it, so the capacity bounds the requirement.
    fn required(config: &EngineConfig) -> usize {
        config.min_history.min(config.max_history.max(1))
    }

    /// Back to the freshly-created state. The engine is stateless and kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.counters = AccuracyCounters::default();
        self.current = PredictionRecord::warming_up(Self::required(&self.config), 0);
        self.phase = SessionPhase::WarmingUp;
        info!("Prediction session reset");
    }

    /// Validate raw dice from the feed and run a cycle. On error nothing
    /// changes: history, counters and the current prediction stay as they
    /// were.
    pub fn ingest_dice(
        &mut self,
        dice: [Option<i64>; 3],
        session: Option<u64>,
    ) -> Result<CycleReport, RoundError> {
        let round = RoundRecord::from_dice(dice, session)?;
        Ok(self.record(round))
    }

    /// One full cycle for an already-validated round.
    pub fn record(&mut self, round: RoundRecord) -> CycleReport {
        let resolution = self.resolve(&round);
        if let Some(res) = &resolution {
            if res.correct {
                self.counters.correct += 1;
            } else {
                self.counters.incorrect += 1;
            }
        }

        self.history.append(round);
        let required = Self::required(&self.config);
        if self.phase == SessionPhase::WarmingUp && self.history.size() >= required {
            self.phase = SessionPhase::Ready;
            info!(rounds = self.history.size(), "Session ready, predictions enabled");
        }

        let mut prediction = match self.phase {
            SessionPhase::WarmingUp => PredictionRecord::warming_up(required, self.history.size()),
            SessionPhase::Ready => self.engine.predict(&self.history),
        };
        if self.config.invert_output && prediction.label != PredictedLabel::Unknown {
            let original = prediction.label;
            prediction.label = original.inverted();
            prediction
                .contributing_factors
                .push(format!("contrarian mode: engine said {original}"));
        }
        prediction.follows_session = round.session;
        prediction.created_at = Some(Utc::now());
        self.current = prediction;

        info!(
            session = ?round.session,
            total = round.total,
            outcome = %round.outcome,
            next = %self.current.label,
            confidence = self.current.confidence,
            hit_rate = format!("{:.1}", self.counters.hit_rate_pct()),
            "Round recorded"
        );

        CycleReport {
            resolution,
            prediction: self.current.clone(),
        }
    }

    /// Score the pending prediction against `actual`. The published label
    /// is what gets scored, so contrarian mode stays consistent.
    fn resolve(&self, actual: &RoundRecord) -> Option<Resolution> {
        let predicted = self.current.label;
        let outcome = predicted.as_outcome()?;
        let correct = outcome == actual.outcome;
        debug!(
            predicted = %predicted,
            actual = %actual.outcome,
            correct,
            "Pending prediction resolved"
        );
        Some(Resolution {
            predicted,
            confidence: self.current.confidence,
            actual: *actual,
            correct,
        })
    }

    pub fn current(&self) -> &PredictionRecord {
        &self.current
    }

    pub fn counters(&self) -> AccuracyCounters {
        self.counters
    }

    pub fn history(&self) -> &RoundHistory {
        &self.history
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }
}
