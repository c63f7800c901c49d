// =============================================================================
// Balance Analyzer — mean reversion against a lopsided window
// =============================================================================

use super::{Analyzer, AnalyzerKind, AnalyzerResult};
use crate::types::{Outcome, RoundRecord};

/// Predicts the minority outcome when the share of HIGH rounds in the window
/// drifts too far from one half.
///
/// `imbalance = (high - n/2) / (n/2)` lies in `[-1, 1]`; the call fires when
/// `|imbalance| > threshold` with confidence `|imbalance| * scale`.
pub struct BalanceAnalyzer {
    window: usize,
    threshold: f64,
    scale: f64,
}

impl BalanceAnalyzer {
    pub fn new(window: usize, threshold: f64, scale: f64) -> Self {
        Self {
            window,
            threshold,
            scale,
        }
    }

    pub fn imbalance(rounds: &[RoundRecord]) -> Option<f64> {
        if rounds.is_empty() {
            return None;
        }
        let half = rounds.len() as f64 / 2.0;
        let high = rounds.iter().filter(|r| r.outcome == Outcome::High).count() as f64;
        Some((high - half) / half)
    }
}

impl Analyzer for BalanceAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Balance
    }

    fn window(&self) -> Option<usize> {
        Some(self.window)
    }

    fn analyze(&self, rounds: &[RoundRecord]) -> AnalyzerResult {
        let Some(imbalance) = Self::imbalance(rounds) else {
            return AnalyzerResult::none();
        };
        if imbalance.abs() <= self.threshold {
            return AnalyzerResult::none();
        }
        let (heavy, minority) = if imbalance > 0.0 {
            (Outcome::High, Outcome::Low)
        } else {
            (Outcome::Low, Outcome::High)
        };
        AnalyzerResult::call(
            minority,
            imbalance.abs() * self.scale,
            format!(
                "Balance (skewed {} {:.0}%)",
                heavy,
                imbalance.abs() * 50.0
            ),
        )
    }
}
