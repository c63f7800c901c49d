// =============================================================================
// Context Classifier
// =============================================================================
//
// Labels the current regime so the ensemble can reweight its analyzers.
//
// Detection hierarchy (evaluated top-to-bottom; first match wins):
//
//   1. LONG_STREAK    streak says BREAK with confidence > 0.6
//   2. STABLE_STREAK  tail run length >= 3
//   3. CHOPPY         volatility > 0.75 (near 1-1 alternation)
//   4. SHORT_STABLE   volatility < 0.25
//   5. MIXED          anything else

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::analyzers::{StreakMode, StreakReading};

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Regime {
    /// Long run that is likely to break.
    LongStreak,
    /// Medium run that is likely to continue.
    StableStreak,
    /// Very frequent switching.
    Choppy,
    /// Few switches, short stable runs.
    ShortStable,
    /// No clear character.
    Mixed,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LongStreak => write!(f, "LONG_STREAK"),
            Self::StableStreak => write!(f, "STABLE_STREAK"),
            Self::Choppy => write!(f, "CHOPPY"),
            Self::ShortStable => write!(f, "SHORT_STABLE"),
            Self::Mixed => write!(f, "MIXED"),
        }
    }
}

// =============================================================================
// ContextClassifier
// =============================================================================

/// Thresholds of the decision table. Pure: no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct ContextClassifier {
    pub long_streak_confidence: f64,
    pub stable_streak_length: usize,
    pub choppy_above: f64,
    pub stable_below: f64,
}

impl Default for ContextClassifier {
    fn default() -> Self {
        Self {
            long_streak_confidence: 0.6,
            stable_streak_length: 3,
            choppy_above: 0.75,
            stable_below: 0.25,
        }
    }
}

impl ContextClassifier {
    /// Classify from the streak reading (absent for histories shorter than
    /// two rounds) and the volatility scalar.
    pub fn classify(&self, streak: Option<&StreakReading>, volatility: f64) -> Regime {
        if let Some(s) = streak {
            if s.mode == StreakMode::Break && s.confidence > self.long_streak_confidence {
                return Regime::LongStreak;
            }
            if s.length >= self.stable_streak_length {
                return Regime::StableStreak;
            }
        }
        if volatility > self.choppy_above {
            return Regime::Choppy;
        }
        if volatility < self.stable_below {
            return Regime::ShortStable;
        }
        trace!(
            volatility = format!("{:.3}", volatility),
            "Regime: no rule matched, MIXED"
        );
        Regime::Mixed
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Outcome;

    fn reading(length: usize, mode: StreakMode, confidence: f64) -> StreakReading {
        StreakReading {
            outcome: Outcome::High,
            length,
            mode,
            confidence,
        }
    }

    #[test]
    fn test_classify_long_streak() {
        let c = ContextClassifier::default();
        let s = reading(6, StreakMode::Break, 0.7);
        assert_eq!(c.classify(Some(&s), 0.9), Regime::LongStreak);
    }

    #[test]
    fn test_weak_break_falls_through_to_stable_streak() {
        let c = ContextClassifier::default();
        let s = reading(4, StreakMode::Break, 0.4);
        assert_eq!(c.classify(Some(&s), 0.5), Regime::StableStreak);
    }

    #[test]
    fn test_classify_stable_streak_before_volatility() {
        let c = ContextClassifier::default();
        let s = reading(3, StreakMode::Continue, 0.45);
        assert_eq!(c.classify(Some(&s), 0.9), Regime::StableStreak);
    }

    #[test]
    fn test_classify_choppy() {
        let c = ContextClassifier::default();
        let s = reading(1, StreakMode::Continue, 0.25);
        assert_eq!(c.classify(Some(&s), 0.8), Regime::Choppy);
    }

    #[test]
    fn test_classify_short_stable() {
        let c = ContextClassifier::default();
        let s = reading(2, StreakMode::Continue, 0.35);
        assert_eq!(c.classify(Some(&s), 0.2), Regime::ShortStable);
    }

    #[test]
    fn test_classify_mixed_boundaries() {
        let c = ContextClassifier::default();
        let s = reading(1, StreakMode::Continue, 0.25);
        assert_eq!(c.classify(Some(&s), 0.75), Regime::Mixed);
        assert_eq!(c.classify(Some(&s), 0.25), Regime::Mixed);
        assert_eq!(c.classify(None, 0.5), Regime::Mixed);
    }

    #[test]
    fn test_regime_display() {
        assert_eq!(format!("{}", Regime::LongStreak), "LONG_STREAK");
        assert_eq!(
            serde_json::to_string(&Regime::ShortStable).unwrap(),
            "\"SHORT_STABLE\""
        );
    }
}
