// =============================================================================
// Pattern Analyzer — repeating L-gram matcher
// =============================================================================
//
// For each configured length L (longest first), every contiguous L-length
// run of outcomes inside the window is mapped to what came right after it.
// The trailing L-gram is then looked up; entries seen fewer than
// `min_occurrences` times are ignored.
//
//   confidence = |a - b| / (a + b) * (1 - 1 / (count + 1))
//
// The second factor damps rarely seen patterns.

use std::collections::HashMap;

use super::markov::FollowCounts;
use super::{majority, Analyzer, AnalyzerKind, AnalyzerResult};
use crate::history::outcomes;
use crate::types::{Outcome, RoundRecord};

pub struct PatternAnalyzer {
    window: usize,
    /// Sorted longest first, deduplicated, all >= 1.
    lengths: Vec<usize>,
    min_occurrences: u32,
}

impl PatternAnalyzer {
    pub fn new(window: usize, lengths: &[usize], min_occurrences: u32) -> Self {
        let mut lengths: Vec<usize> = lengths.iter().copied().filter(|&l| l > 0).collect();
        lengths.sort_unstable_by(|a, b| b.cmp(a));
        lengths.dedup();
        Self {
            window,
            lengths,
            min_occurrences: min_occurrences.max(1),
        }
    }

    /// Follower counts for every L-gram in `seq` that has a successor.
    fn table(seq: &[Outcome], len: usize) -> HashMap<&[Outcome], FollowCounts> {
        let mut table: HashMap<&[Outcome], FollowCounts> = HashMap::new();
        if seq.len() <= len {
            return table;
        }
        for start in 0..seq.len() - len {
            let entry = table.entry(&seq[start..start + len]).or_default();
            match seq[start + len] {
                Outcome::High => entry.high += 1,
                Outcome::Low => entry.low += 1,
            }
        }
        table
    }

    fn match_length(&self, seq: &[Outcome], len: usize) -> Option<AnalyzerResult> {
        if seq.len() <= len {
            return None;
        }
        let current = &seq[seq.len() - len..];
        let table = Self::table(seq, len);
        let counts = table.get(current)?;
        let count = counts.total();
        if count < self.min_occurrences {
            return None;
        }
        let label = majority(counts.high, counts.low)?;
        let ratio = f64::from(counts.high.abs_diff(counts.low)) / f64::from(count);
        let damping = 1.0 - 1.0 / (f64::from(count) + 1.0);
        let code: String = current.iter().map(|o| o.code()).collect();
        Some(AnalyzerResult::call(
            label,
            ratio * damping,
            format!("Pattern ({code}) x{count}"),
        ))
    }
}

impl Analyzer for PatternAnalyzer {
    fn kind(&self) -> AnalyzerKind {
        AnalyzerKind::Pattern
    }

    fn window(&self) -> Option<usize> {
        Some(self.window)
    }

    fn analyze(&self, rounds: &[RoundRecord]) -> AnalyzerResult {
        let seq = outcomes(rounds);
        self.lengths
            .iter()
            .find_map(|&len| self.match_length(&seq, len))
            .unwrap_or_else(AnalyzerResult::none)
    }
}
