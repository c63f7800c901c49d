// =============================================================================
// Transition (Markov) Analyzer — second-order outcome transitions
// =============================================================================
//
// Counts, over the whole history, which outcome followed each ordered pair of
// consecutive outcomes, then looks up the pair formed by the last two rounds.
// Confidence is the normalised count difference |a - b| / (a + b), not a
// probability estimate.

use std::collections::HashMap;

use super::{majority, Analyzer, AnalyzerKind, AnalyzerResult};
use crate::types::{Outcome, RoundRecord};

/// Ordered pair `(older, newer)` of consecutive outcomes.
pub type TransitionKey = (Outcome, Outcome);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FollowCounts {
    pub high: u32,
    pub low: u32,
}

impl FollowCounts {
    fn bump(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::High => self.high += 1,
            Outcome::Low => self.low += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.high + self.low
    }
}

/// Pair → follower counts.
#[derive(Debug, Clone, Default)]
pub struct TransitionTable {
    counts: HashMap<TransitionKey, FollowCounts>,
}

impl TransitionTable {
    pub fn build(rounds: &[RoundRecord]) -> Self {
        let mut counts: HashMap<TransitionKey, FollowCounts> = HashMap::new();
        for w in rounds.windows(3) {
            counts
                .entry((w[0].outcome, w[1].outcome))
                .or_default()
                .bump(w[2].outcome);
        }
        Self { counts }
    }

    pub fn get(&self, key: TransitionKey) -> Option<FollowCounts> {
        self.counts.get(&key).copied()
    }

    /// Majority follower for `key` and its normalised score difference.
    pub fn query(&self, key: TransitionKey) -> Option<(Outcome, f64)> {
        let c = self.get(key)?;
        if c.total() == 0 {
            return None;
        }
        let label = majority(c.high, c.low)?;
        let confidence = f64::from(c.high.abs_diff(c.low)) / f64::from(c.total());
        Some((label, confidence))
    }
}

pub struct MarkovAnalyzer;

impl Analyzer for MarkovAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Markov
    }

    fn window(&self) -> Option<usize> {
        None
    }

    fn analyze(&self, rounds: &[RoundRecord]) -> AnalyzerResult {
        if rounds.len() < 3 {
            return AnalyzerResult::none();
        }
        let n = rounds.len();
        let key = (rounds[n - 2].outcome, rounds[n - 1].outcome);
        let table = TransitionTable::build(rounds);

        match table.query(key) {
            Some((label, confidence)) => AnalyzerResult::call(
                label,
                confidence,
                format!("Markov({}{}) -> {}", key.0.code(), key.1.code(), label),
            ),
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
    fn test_alternation_predicts_the_observed_transition() {
        // Chronological L,H,L,H: the last pair (L,H) was followed once by L.
        let r = MarkovAnalyzer.analyze(&rounds_of(&[L, H, L, H]));
        assert_eq!(r.label, Some(L));
        assert!((r.confidence - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_table_query_direct() {
        let table = TransitionTable::build(&rounds_of(&[H, L, H, L]));
        assert_eq!(table.query((H, L)), Some((H, 1.0)));
        assert_eq!(table.query((L, H)), Some((L, 1.0)));
        assert_eq!(table.query((H, H)), None);
    }

    #[test]
    fn test_normalised_difference() {
        // (H,H) followed by H, H, L => 2 vs 1 => 1/3.
        let seq = [H, H, H, H, L, H, H];
        let table = TransitionTable::build(&rounds_of(&seq));
        assert_eq!(table.get((H, H)), Some(FollowCounts { high: 2, low: 1 }));
        let r = MarkovAnalyzer.analyze(&rounds_of(&seq));
        assert_eq!(r.label, Some(H));
        assert!((r.confidence - 1.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_tie_and_unseen_key_are_none() {
        assert_eq!(
            MarkovAnalyzer.analyze(&rounds_of(&[L, L, H, L, L, L, L])).label,
            Some(L)
        );
        // (L,L) followed by L once and H once.
        let tie = rounds_of(&[L, L, L, H, L, L]);
        let table = TransitionTable::build(&tie);
        let c = table.get((L, L)).unwrap();
        assert_eq!(c.high, c.low);
        assert!(MarkovAnalyzer.analyze(&tie).is_none());
        assert!(MarkovAnalyzer.analyze(&rounds_of(&[H, L, L])).is_none());
    }

    #[test]
    fn test_short_history_is_none() {
        assert!(MarkovAnalyzer.analyze(&rounds_of(&[H, L])).is_none());
    }
}
