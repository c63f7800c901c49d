// =============================================================================
// Analyzers Module
// =============================================================================
//
// Independent heuristics over the round history. Each one is stateless given
// its input slice:
// - Streak (follow short runs, break long ones)
// - Transition / Markov (what followed the current last-two pair)
// - Pattern (what followed the current trailing L-gram)
// - Balance (mean reversion against a lopsided window)
// - Score trend (mean total far from the 10.5 midpoint)
// - Volatility (switch fraction, non-directional)

pub mod balance;
pub mod markov;
pub mod pattern;
pub mod score_trend;
pub mod streak;
pub mod volatility;

use serde::{Deserialize, Serialize};

use crate::types::{Outcome, RoundRecord};

pub use balance::BalanceAnalyzer;
pub use markov::MarkovAnalyzer;
pub use pattern::PatternAnalyzer;
pub use score_trend::ScoreTrendAnalyzer;
pub use streak::{StreakAnalyzer, StreakMode, StreakReading};
pub use volatility::VolatilityAnalyzer;

/// Identifies an analyzer in weight tables and traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyzerKind {
    Markov,
    Streak,
    Balance,
    Pattern,
    ScoreTrend,
    Volatility,
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Markov => write!(f, "markov"),
            Self::Streak => write!(f, "streak"),
            Self::Balance => write!(f, "balance"),
            Self::Pattern => write!(f, "pattern"),
            Self::ScoreTrend => write!(f, "score_trend"),
            Self::Volatility => write!(f, "volatility"),
        }
    }
}

/// Output of one analyzer for one prediction call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzerResult {
    /// `None` when the analyzer has nothing to say.
    pub label: Option<Outcome>,
    /// In `[0.0, 1.0]`.
    pub confidence: f64,
    pub rationale: String,
}

impl AnalyzerResult {
    pub fn none() -> Self {
        Self {
            label: None,
            confidence: 0.0,
            rationale: String::new(),
        }
    }

    pub fn call(label: Outcome, confidence: f64, rationale: impl Into<String>) -> Self {
        let confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            label: Some(label),
            confidence,
            rationale: rationale.into(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.label.is_none()
    }
}

/// A directional heuristic over a slice of rounds.
pub trait Analyzer: Send + Sync {
    fn kind(&self) -> AnalyzerKind;

    /// How many of the most recent rounds this analyzer looks at. `None`
    /// means the whole history.
    fn window(&self) -> Option<usize>;

    /// Analyze `rounds` (oldest-first), already trimmed to [`Self::window`].
    fn analyze(&self, rounds: &[RoundRecord]) -> AnalyzerResult;
}

/// Majority of two counts. Ties have no majority.
pub(crate) fn majority(high: u32, low: u32) -> Option<Outcome> {
    match high.cmp(&low) {
        std::cmp::Ordering::Greater => Some(Outcome::High),
        std::cmp::Ordering::Less => Some(Outcome::Low),
        std::cmp::Ordering::Equal => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_clamps_confidence() {
        assert!((AnalyzerResult::call(Outcome::High, 1.7, "x").confidence - 1.0).abs() < 1e-12);
        assert!(AnalyzerResult::call(Outcome::Low, -0.2, "x").confidence.abs() < 1e-12);
        assert!(AnalyzerResult::call(Outcome::Low, f64::NAN, "x").confidence.abs() < 1e-12);
    }

    #[test]
    fn test_majority() {
        assert_eq!(majority(3, 1), Some(Outcome::High));
        assert_eq!(majority(0, 2), Some(Outcome::Low));
        assert_eq!(majority(2, 2), None);
    }

    #[test]
    fn test_kind_serialises_snake_case() {
        assert_eq!(
            serde_json::to_string(&AnalyzerKind::ScoreTrend).unwrap(),
            "\"score_trend\""
        );
        assert_eq!(AnalyzerKind::Markov.to_string(), "markov");
    }
}
