// =============================================================================
// Round History — bounded FIFO store of finalized rounds
// =============================================================================
//
// Insertion order is chronological. When the store is full the oldest round
// is evicted silently; nothing is archived.

use std::collections::VecDeque;

use crate::types::{Outcome, RoundRecord};

/// Bounded, order-preserving sequence of finalized rounds.
#[derive(Debug, Clone)]
pub struct RoundHistory {
    rounds: VecDeque<RoundRecord>,
    max_rounds: usize,
}

impl RoundHistory {
    /// Create an empty store holding at most `max_rounds` rounds (minimum 1).
    pub fn new(max_rounds: usize) -> Self {
        let max_rounds = max_rounds.max(1);
        Self {
            rounds: VecDeque::with_capacity(max_rounds.min(4096) + 1),
            max_rounds,
        }
    }

    /// Append to the tail, trimming the head to stay within capacity.
    pub fn append(&mut self, record: RoundRecord) {
        self.rounds.push_back(record);
        while self.rounds.len() > self.max_rounds {
            self.rounds.pop_front();
        }
    }

    /// The most recent `n` rounds (oldest-first), or all of them if fewer.
    pub fn window(&self, n: usize) -> Vec<RoundRecord> {
        let start = self.rounds.len().saturating_sub(n);
        self.rounds.range(start..).copied().collect()
    }

    pub fn size(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.max_rounds
    }

    pub fn latest(&self) -> Option<&RoundRecord> {
        self.rounds.back()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RoundRecord> {
        self.rounds.iter()
    }

    pub fn clear(&mut self) {
        self.rounds.clear();
    }

    /// Chronological outcome codes of the last `n` rounds, e.g. `"TTXT"`.
    pub fn outcome_string(&self, n: usize) -> String {
        let start = self.rounds.len().saturating_sub(n);
        self.rounds
            .range(start..)
            .map(|r| r.outcome.code())
            .collect()
    }
}

/// The last `n` elements of a slice (or the whole slice if shorter).
pub fn tail<T>(items: &[T], n: usize) -> &[T] {
    &items[items.len().saturating_sub(n)..]
}

/// Outcomes of a slice of rounds, in order.
pub fn outcomes(rounds: &[RoundRecord]) -> Vec<Outcome> {
    rounds.iter().map(|r| r.outcome).collect()
}
