// =============================================================================
// Volatility Analyzer — fraction of outcome switches
// =============================================================================
//
//   volatility = switches / (n - 1)
//
// 0.0 is one unbroken run, 1.0 is perfect alternation. Non-directional: the
// value feeds the context classifier and damps the final confidence.

use crate::types::RoundRecord;

pub struct VolatilityAnalyzer {
    window: usize,
}

impl VolatilityAnalyzer {
    pub fn new(window: usize) -> Self {
        Self { window }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Switch fraction over `rounds` (already trimmed to the window).
    pub fn measure(&self, rounds: &[RoundRecord]) -> f64 {
        if rounds.len() < 2 {
            return 0.0;
        }
        let switches = rounds
            .windows(2)
            .filter(|w| w[0].outcome != w[1].outcome)
            .count();
        switches as f64 / (rounds.len() - 1) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{rounds_of, Outcome};
    use Outcome::{High as H, Low as L};

    #[test]
    fn test_extremes() {
        let v = VolatilityAnalyzer::new(20);
        assert!(v.measure(&rounds_of(&[H, H, H, H])).abs() < 1e-12);
        assert!((v.measure(&rounds_of(&[H, L, H, L, H])) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_partial() {
        let v = VolatilityAnalyzer::new(20);
        // 2 switches over 4 gaps
        assert!((v.measure(&rounds_of(&[H, H, L, L, H])) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_short_input_is_zero() {
        let v = VolatilityAnalyzer::new(20);
        assert_eq!(v.measure(&[]), 0.0);
        assert_eq!(v.measure(&rounds_of(&[L])), 0.0);
    }
}
