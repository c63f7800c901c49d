// =============================================================================
// Score-Trend Analyzer — mean total versus the 10.5 midpoint
// =============================================================================

use super::{Analyzer, AnalyzerKind, AnalyzerResult};
use crate::types::{Outcome, RoundRecord};

/// Midpoint between the highest LOW total (10) and the lowest HIGH total (11).
const MIDPOINT: f64 = 10.5;

/// Calls HIGH (LOW) when the mean total of the last `window` rounds sits more
/// than `band` above (below) 10.5. Confidence is the distance from the
/// midpoint divided by `spread`.
pub struct ScoreTrendAnalyzer {
    window: usize,
    band: f64,
    spread: f64,
}

impl ScoreTrendAnalyzer {
    pub fn new(window: usize, band: f64, spread: f64) -> Self {
        Self {
            window: window.max(1),
            band,
            spread: if spread > 0.0 { spread } else { 7.5 },
        }
    }
}

impl Analyzer for ScoreTrendAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::ScoreTrend
    }

    fn window(&self) -> Option<usize> {
        Some(self.window)
    }

    fn analyze(&self, rounds: &[RoundRecord]) -> AnalyzerResult {
        // A partial window says too little about the level of the totals.
        if rounds.len() < self.window {
            return AnalyzerResult::none();
        }
        let mean =
            rounds.iter().map(|r| f64::from(r.total)).sum::<f64>() / rounds.len() as f64;
        let distance = mean - MIDPOINT;
        if distance.abs() <= self.band {
            return AnalyzerResult::none();
        }
        let label = if distance > 0.0 {
            Outcome::High
        } else {
            Outcome::Low
        };
        AnalyzerResult::call(
            label,
            distance.abs() / self.spread,
            format!("Mean total {:.1}", mean),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn totals(ts: &[i64]) -> Vec<RoundRecord> {
        ts.iter().map(|&t| RoundRecord::from_total(t).unwrap()).collect()
    }

    #[test]
    fn test_high_mean_predicts_high() {
        let a = ScoreTrendAnalyzer::new(5, 2.3, 7.5);
        let r = a.analyze(&totals(&[14, 15, 13, 16, 12]));
        assert_eq!(r.label, Some(Outcome::High));
        // mean 14.0 => 3.5 / 7.5
        assert!((r.confidence - 3.5 / 7.5).abs() < 1e-10);
    }

    #[test]
    fn test_low_mean_predicts_low() {
        let a = ScoreTrendAnalyzer::new(4, 2.3, 7.5);
        let r = a.analyze(&totals(&[5, 6, 8, 7]));
        assert_eq!(r.label, Some(Outcome::Low));
    }

    #[test]
    fn test_near_midpoint_is_none() {
        let a = ScoreTrendAnalyzer::new(4, 2.3, 7.5);
        assert!(a.analyze(&totals(&[10, 11, 12, 9])).is_none());
    }

    #[test]
    fn test_partial_window_is_none() {
        let a = ScoreTrendAnalyzer::new(15, 2.3, 7.5);
        assert!(a.analyze(&totals(&[18, 18, 18])).is_none());
    }

    #[test]
    fn test_extreme_mean_is_clamped() {
        let a = ScoreTrendAnalyzer::new(3, 2.3, 5.0);
        let r = a.analyze(&totals(&[18, 18, 18]));
        assert!((r.confidence - 1.0).abs() < 1e-12);
    }
}
