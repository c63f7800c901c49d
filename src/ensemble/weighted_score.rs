// =============================================================================
// Weighted Ensemble Combiner — Regime-aware vote aggregation
// =============================================================================
//
// Every firing analyzer adds `confidence * weight` to the HIGH or LOW
// accumulator. Weights start from the base table and are multiplied by the
// regime's adjustments for this call only.
//
//   confidence = |HIGH - LOW| / (HIGH + LOW) * 100 * (1 - volatility * 0.2)
//
// rounded, then capped at 96. Ties go to LOW. When nothing fires the
// fallback strategy decides and the confidence is a flat 35.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::fallback::{FallbackMode, FallbackStrategy};
use crate::analyzers::{AnalyzerKind, AnalyzerResult};
use crate::regime::Regime;
use crate::types::{Outcome, PredictedLabel};

const CONSENSUS: &str = "multi-model consensus";
const WEAK_CONSENSUS: &str = "consensus from weak models";

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_base_weights() -> BTreeMap<AnalyzerKind, f64> {
    BTreeMap::from([
        (AnalyzerKind::Markov, 1.0),
        (AnalyzerKind::Streak, 1.2),
        (AnalyzerKind::Balance, 1.1),
        (AnalyzerKind::Pattern, 1.3),
        (AnalyzerKind::ScoreTrend, 0.9),
        (AnalyzerKind::Volatility, 0.8),
    ])
}

fn default_regime_multipliers() -> BTreeMap<Regime, BTreeMap<AnalyzerKind, f64>> {
    use AnalyzerKind::*;
    BTreeMap::from([
        (
            Regime::LongStreak,
            BTreeMap::from([(Streak, 2.5), (Balance, 1.5), (Markov, 0.3), (Pattern, 0.3)]),
        ),
        (
            Regime::StableStreak,
            BTreeMap::from([(Streak, 2.0), (Markov, 1.2), (Balance, 0.5)]),
        ),
        (
            Regime::Choppy,
            BTreeMap::from([(Volatility, 2.0), (Markov, 1.5), (Streak, 0.1), (Balance, 1.2)]),
        ),
        (Regime::ShortStable, BTreeMap::new()),
        (Regime::Mixed, BTreeMap::new()),
    ])
}

fn default_mixed_volatility_threshold() -> f64 {
    0.6
}

fn default_mixed_volatility_scale() -> f64 {
    0.8
}

fn default_signal_floor() -> f64 {
    0.1
}

fn default_factor_threshold() -> f64 {
    0.5
}

fn default_fallback_confidence() -> f64 {
    35.0
}

fn default_volatility_damping() -> f64 {
    0.2
}

fn default_max_confidence() -> f64 {
    96.0
}

fn default_primary_share() -> f64 {
    0.4
}

// =============================================================================
// EnsembleConfig
// =============================================================================

/// Weight tables and thresholds of the combiner. Swappable without touching
/// any analyzer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Starting weight per analyzer. Missing analyzers weigh 0.
    ///
    /// The volatility entry never moves the output: that analyzer casts no
    /// directional vote and acts through the classifier and the confidence
    /// damping instead. It stays so weight tables can be tuned as a whole.
    #[serde(default = "default_base_weights")]
    pub base_weights: BTreeMap<AnalyzerKind, f64>,

    /// Per-regime multipliers applied on top of the base weights.
    ///
    /// Same caveat as `base_weights`: the CHOPPY volatility multiplier shows
    /// up in `weights_for` but has no effect on any prediction.
    #[serde(default = "default_regime_multipliers")]
    pub regime_multipliers: BTreeMap<Regime, BTreeMap<AnalyzerKind, f64>>,

    /// In MIXED, volatility above this scales every weight down.
    #[serde(default = "default_mixed_volatility_threshold")]
    pub mixed_volatility_threshold: f64,

    #[serde(default = "default_mixed_volatility_scale")]
    pub mixed_volatility_scale: f64,

    /// Results at or below this confidence do not vote.
    #[serde(default = "default_signal_floor")]
    pub signal_floor: f64,

    /// Results above this confidence are listed as contributing factors.
    #[serde(default = "default_factor_threshold")]
    pub factor_threshold: f64,

    /// Confidence (0-100) reported when the fallback decides.
    #[serde(default = "default_fallback_confidence")]
    pub fallback_confidence: f64,

    /// Final confidence is multiplied by `1 - volatility * damping`.
    #[serde(default = "default_volatility_damping")]
    pub volatility_damping: f64,

    /// Hard cap on the final confidence (0-100).
    #[serde(default = "default_max_confidence")]
    pub max_confidence: f64,

    /// Share of the total score above which the streak call is reported as
    /// the primary method.
    #[serde(default = "default_primary_share")]
    pub primary_share: f64,

    #[serde(default)]
    pub fallback: FallbackMode,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            base_weights: default_base_weights(),
            regime_multipliers: default_regime_multipliers(),
            mixed_volatility_threshold: default_mixed_volatility_threshold(),
            mixed_volatility_scale: default_mixed_volatility_scale(),
            signal_floor: default_signal_floor(),
            factor_threshold: default_factor_threshold(),
            fallback_confidence: default_fallback_confidence(),
            volatility_damping: default_volatility_damping(),
            max_confidence: default_max_confidence(),
            primary_share: default_primary_share(),
            fallback: FallbackMode::default(),
        }
    }
}

// =============================================================================
// Output types
// =============================================================================

/// One analyzer's vote in the final score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub analyzer: AnalyzerKind,
    pub label: Outcome,
    pub confidence: f64,
    pub weight: f64,
    pub score: f64,
}

/// The published call for the next round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub label: PredictedLabel,
    /// In `[0, 100]`.
    pub confidence: f64,
    /// Rationales of the strongest analyzers, strongest first.
    pub contributing_factors: Vec<String>,
    /// Absent while warming up.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regime: Option<Regime>,
    pub primary_method: String,
    pub high_score: f64,
    pub low_score: f64,
    pub volatility: f64,
    pub contributions: Vec<Contribution>,
    /// Feed session id of the round this prediction was computed after.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follows_session: Option<u64>,
    /// Stamped by the session when the record is published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PredictionRecord {
    /// The record published while there is not enough history.
    pub fn warming_up(required: usize, have: usize) -> Self {
        Self {
            label: PredictedLabel::Unknown,
            confidence: 0.0,
            contributing_factors: vec![format!("need {required} rounds, have {have}")],
            regime: None,
            primary_method: "warming up".to_string(),
            high_score: 0.0,
            low_score: 0.0,
            volatility: 0.0,
            contributions: Vec::new(),
            follows_session: None,
            created_at: None,
        }
    }
}

// =============================================================================
// WeightedCombiner
// =============================================================================

pub struct WeightedCombiner {
    config: EnsembleConfig,
    fallback: Box<dyn FallbackStrategy>,
}

impl WeightedCombiner {
    pub fn new(config: EnsembleConfig) -> Self {
        let fallback = config.fallback.build();
        Self { config, fallback }
    }

    /// Use a caller-supplied fallback instead of the configured one.
    pub fn with_fallback(config: EnsembleConfig, fallback: Box<dyn FallbackStrategy>) -> Self {
        Self { config, fallback }
    }

    /// Effective weights for one call under `regime`.
    pub fn weights_for(&self, regime: Regime, volatility: f64) -> BTreeMap<AnalyzerKind, f64> {
        let mut weights = self.config.base_weights.clone();
        if let Some(multipliers) = self.config.regime_multipliers.get(&regime) {
            for (kind, factor) in multipliers {
                if let Some(w) = weights.get_mut(kind) {
                    *w *= factor;
                }
            }
        }
        if regime == Regime::Mixed && volatility > self.config.mixed_volatility_threshold {
            for w in weights.values_mut() {
                *w *= self.config.mixed_volatility_scale;
            }
        }
        for w in weights.values_mut() {
            *w = w.max(0.0);
        }
        weights
    }

    /// Combine analyzer results into one record. Pure apart from the
    /// fallback strategy, which is only consulted when nothing fires.
    pub fn combine(
        &self,
        results: &[(AnalyzerKind, AnalyzerResult)],
        regime: Regime,
        volatility: f64,
        last_outcome: Option<Outcome>,
    ) -> PredictionRecord {
        let cfg = &self.config;
        let volatility = if volatility.is_finite() {
            volatility.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let weights = self.weights_for(regime, volatility);

        let mut high_score = 0.0;
        let mut low_score = 0.0;
        let mut contributions = Vec::new();
        let mut factors: Vec<(f64, String)> = Vec::new();

        for (kind, result) in results {
            let Some(label) = result.label else { continue };
            if result.confidence <= cfg.signal_floor {
                continue;
            }
            let weight = weights.get(kind).copied().unwrap_or(0.0);
            let score = result.confidence * weight;
            match label {
                Outcome::High => high_score += score,
                Outcome::Low => low_score += score,
            }
            contributions.push(Contribution {
                analyzer: *kind,
                label,
                confidence: result.confidence,
                weight,
                score,
            });
            if result.confidence > cfg.factor_threshold {
                factors.push((
                    result.confidence,
                    format!("{}: {:.0}%", result.rationale, result.confidence * 100.0),
                ));
            }
        }

        let total = high_score + low_score;
        if total <= 0.0 {
            return self.fallback_record(regime, volatility, last_outcome, contributions);
        }

        let winner = if high_score > low_score {
            Outcome::High
        } else {
            Outcome::Low
        };

        let raw = (high_score - low_score).abs() / total * 100.0;
        let damped = raw * (1.0 - volatility * cfg.volatility_damping);
        let confidence = damped.round().min(cfg.max_confidence).clamp(0.0, 100.0);

        // Stable sort keeps analyzer order among equal confidences.
        factors.sort_by(|a, b| b.0.total_cmp(&a.0));
        let mut contributing_factors: Vec<String> = factors.into_iter().map(|(_, f)| f).collect();
        if contributing_factors.is_empty() {
            contributing_factors.push(WEAK_CONSENSUS.to_string());
        }

        let primary_method = results
            .iter()
            .find(|(kind, r)| *kind == AnalyzerKind::Streak && r.label.is_some())
            .filter(|(_, r)| {
                let w = weights.get(&AnalyzerKind::Streak).copied().unwrap_or(0.0);
                w * r.confidence > total * cfg.primary_share
            })
            .map(|(_, r)| r.rationale.clone())
            .unwrap_or_else(|| CONSENSUS.to_string());

        PredictionRecord {
            label: winner.into(),
            confidence,
            contributing_factors,
            regime: Some(regime),
            primary_method,
            high_score,
            low_score,
            volatility,
            contributions,
            follows_session: None,
            created_at: None,
        }
    }

    fn fallback_record(
        &self,
        regime: Regime,
        volatility: f64,
        last_outcome: Option<Outcome>,
        contributions: Vec<Contribution>,
    ) -> PredictionRecord {
        let (label, confidence, note) = match self.fallback.decide(last_outcome) {
            Some(outcome) => (
                PredictedLabel::from(outcome),
                self.config.fallback_confidence.clamp(0.0, 100.0),
                format!("no clear signal, fallback: {}", self.fallback.name()),
            ),
            None => (
                PredictedLabel::Unknown,
                0.0,
                "no clear signal and no history to fall back on".to_string(),
            ),
        };
        PredictionRecord {
            label,
            confidence,
            contributing_factors: vec![note],
            regime: Some(regime),
            primary_method: format!("fallback ({})", self.fallback.name()),
            high_score: 0.0,
            low_score: 0.0,
            volatility,
            contributions,
            follows_session: None,
            created_at: None,
        }
    }
}

impl Default for WeightedCombiner {
    fn default() -> Self {
        Self::new(EnsembleConfig::default())
    }
}
