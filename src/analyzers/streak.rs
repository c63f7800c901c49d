// =============================================================================
// Streak Analyzer — follow short runs, break long ones
// =============================================================================
//
// The tail run of identical outcomes decides the call:
//
//   streak >= threshold  =>  BREAK     opposite label, 0.40 + 0.15/extra round, cap 0.90
//   streak <  threshold  =>  CONTINUE  same label,     0.15 + 0.10 * streak
//
// This is the most heavily weighted signal in the ensemble.

use serde::{Deserialize, Serialize};

use super::{Analyzer, AnalyzerKind, AnalyzerResult};
use crate::types::{Outcome, RoundRecord};

const BREAK_BASE: f64 = 0.40;
const BREAK_STEP: f64 = 0.15;
const BREAK_CAP: f64 = 0.90;
const CONTINUE_BASE: f64 = 0.15;
const CONTINUE_STEP: f64 = 0.10;

/// Whether the analyzer expects the run to continue or to break.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreakMode {
    Continue,
    Break,
}

/// Raw reading of the tail run, consumed by the context classifier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StreakReading {
    /// Outcome repeated by the run.
    pub outcome: Outcome,
    pub length: usize,
    pub mode: StreakMode,
    pub confidence: f64,
}

impl StreakReading {
    /// The label this reading votes for.
    pub fn label(&self) -> Outcome {
        match self.mode {
            StreakMode::Continue => self.outcome,
            StreakMode::Break => self.outcome.opposite(),
        }
    }

    pub fn rationale(&self) -> String {
        match self.mode {
            StreakMode::Break => format!("Break {} streak (length {})", self.outcome, self.length),
            StreakMode::Continue => {
                format!("Follow {} streak (length {})", self.outcome, self.length)
            }
        }
    }
}

pub struct StreakAnalyzer {
    break_threshold: usize,
}

impl StreakAnalyzer {
    pub fn new(break_threshold: usize) -> Self {
        Self {
            break_threshold: break_threshold.max(1),
        }
    }

    /// Measure the tail run. `None` for fewer than two rounds.
    pub fn read(&self, rounds: &[RoundRecord]) -> Option<StreakReading> {
        if rounds.len() < 2 {
            return None;
        }
        let outcome = rounds.last()?.outcome;
        let length = rounds
            .iter()
            .rev()
            .take_while(|r| r.outcome == outcome)
            .count();

        let (mode, confidence) = if length >= self.break_threshold {
            let extra = (length - self.break_threshold) as f64;
            (StreakMode::Break, (BREAK_BASE + extra * BREAK_STEP).min(BREAK_CAP))
        } else {
            (
                StreakMode::Continue,
                CONTINUE_BASE + length as f64 * CONTINUE_STEP,
            )
        };

        Some(StreakReading {
            outcome,
            length,
            mode,
            confidence,
        })
    }
}

impl Analyzer for StreakAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Streak
    }

    fn window(&self) -> Option<usize> {
        None
    }

    fn analyze(&self, rounds: &[RoundRecord]) -> AnalyzerResult {
        match self.read(rounds) {
            Some(reading) => {
                AnalyzerResult::call(reading.label(), reading.confidence, reading.rationale())
            }
            None => AnalyzerResult::none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::rounds_of;
    use Outcome::{High as H, Low as L};

    #[test]
    fn test_three_lows_break_at_threshold_three() {
        let a = StreakAnalyzer::new(3);
        let r = a.analyze(&rounds_of(&[L, L, L]));
        assert_eq!(r.label, Some(H));
        assert!(r.confidence >= 0.4);
    }

    #[test]
    fn test_short_streak_continues() {
        let a = StreakAnalyzer::new(4);
        let reading = a.read(&rounds_of(&[L, H, H])).unwrap();
        assert_eq!(reading.mode, StreakMode::Continue);
        assert_eq!(reading.length, 2);
        assert_eq!(reading.label(), H);
        assert!((reading.confidence - 0.35).abs() < 1e-10);
    }

    #[test]
    fn test_break_confidence_non_decreasing_and_capped() {
        let a = StreakAnalyzer::new(4);
        let mut prev = 0.0;
        for k in 4..20 {
            let mut seq = vec![L];
            seq.extend(std::iter::repeat(H).take(k));
            let r = a.analyze(&rounds_of(&seq));
            assert_eq!(r.label, Some(L), "k = {k}");
            assert!(r.confidence >= prev);
            assert!(r.confidence <= 0.9 + 1e-12);
            prev = r.confidence;
        }
        assert!((prev - 0.9).abs() < 1e-10);
    }

    #[test]
    fn test_needs_two_rounds() {
        let a = StreakAnalyzer::new(4);
        assert!(a.analyze(&rounds_of(&[H])).is_none());
        assert!(a.analyze(&[]).is_none());
    }

    #[test]
    fn test_rationale_mentions_mode() {
        let a = StreakAnalyzer::new(2);
        let r = a.analyze(&rounds_of(&[H, H]));
        assert!(r.rationale.starts_with("Break HIGH"));
    }
}
