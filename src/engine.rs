// =============================================================================
// Prediction Engine — one full analysis pass over the round history
// =============================================================================
//
// Pipeline:
//   1. Run every directional analyzer over its configured window
//   2. Measure volatility over its window
//   3. Classify the regime from the streak reading + volatility
//   4. Combine the calls under the regime's weights
//
// Synchronous and free of interior mutability: the caller owns the history
// and decides when to run a pass.
// =============================================================================

use tracing::debug;

use crate::analyzers::{
    Analyzer, AnalyzerKind, AnalyzerResult, BalanceAnalyzer, MarkovAnalyzer, PatternAnalyzer,
    ScoreTrendAnalyzer, StreakAnalyzer, VolatilityAnalyzer,
};
use crate::ensemble::{FallbackStrategy, PredictionRecord, WeightedCombiner};
use crate::history::{tail, RoundHistory};
use crate::regime::ContextClassifier;
use crate::runtime_config::EngineConfig;

pub struct PredictionEngine {
    streak: StreakAnalyzer,
    /// Directional analyzers other than the streak analyzer, in vote order.
    analyzers: Vec<Box<dyn Analyzer>>,
    volatility: VolatilityAnalyzer,
    classifier: ContextClassifier,
    combiner: WeightedCombiner,
}

impl PredictionEngine {
    pub fn new(config: &EngineConfig) -> Self {
        Self::with_combiner(config, WeightedCombiner::new(config.ensemble.clone()))
    }

    /// Build with an explicit fallback strategy (e.g. a seeded coin flip).
    pub fn with_fallback(config: &EngineConfig, fallback: Box<dyn FallbackStrategy>) -> Self {
        Self::with_combiner(
            config,
            WeightedCombiner::with_fallback(config.ensemble.clone(), fallback),
        )
    }

    fn with_combiner(config: &EngineConfig, combiner: WeightedCombiner) -> Self {
        let analyzers: Vec<Box<dyn Analyzer>> = vec![
            Box::new(MarkovAnalyzer),
            Box::new(BalanceAnalyzer::new(
                config.balance_window,
                config.balance_threshold,
                config.balance_scale,
            )),
            Box::new(PatternAnalyzer::new(
                config.pattern_window,
                &config.pattern_lengths,
                config.pattern_min_occurrences,
            )),
            Box::new(ScoreTrendAnalyzer::new(
                config.score_window,
                config.score_band,
                config.score_spread,
            )),
        ];
        Self {
            streak: StreakAnalyzer::new(config.streak_break_threshold),
            analyzers,
            volatility: VolatilityAnalyzer::new(config.volatility_window),
            classifier: ContextClassifier::default(),
            combiner,
        }
    }

    /// Run every analyzer and return their results, streak first.
    pub fn analyze(&self, history: &RoundHistory) -> Vec<(AnalyzerKind, AnalyzerResult)> {
        let rounds = history.window(history.size());
        let mut results = Vec::with_capacity(self.analyzers.len() + 1);
        results.push((self.streak.kind(), self.streak.analyze(&rounds)));
        for analyzer in &self.analyzers {
            let slice = match analyzer.window() {
                Some(n) => tail(&rounds, n),
                None => &rounds[..],
            };
            results.push((analyzer.kind(), analyzer.analyze(slice)));
        }
        results
    }

    /// One full pass: analyzers, regime, combination.
    pub fn predict(&self, history: &RoundHistory) -> PredictionRecord {
        let rounds = history.window(history.size());
        let results = self.analyze(history);

        let volatility = self
            .volatility
            .measure(tail(&rounds, self.volatility.window()));
        let reading = self.streak.read(&rounds);
        let regime = self.classifier.classify(reading.as_ref(), volatility);

        let record = self.combiner.combine(
            &results,
            regime,
            volatility,
            history.latest().map(|r| r.outcome),
        );

        debug!(
            regime = %regime,
            volatility = format!("{:.3}", volatility),
            high_score = format!("{:.3}", record.high_score),
            low_score = format!("{:.3}", record.low_score),
            label = %record.label,
            confidence = record.confidence,
            "Engine pass complete"
        );

        record
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::CoinFlip;
    use crate::regime::Regime;
    use crate::types::{Outcome, PredictedLabel, RoundRecord};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use Outcome::{High as H, Low as L};

    fn history_of(outcomes: &[Outcome]) -> RoundHistory {
        let mut h = RoundHistory::new(1000);
        for &o in outcomes {
            h.append(RoundRecord::of(o));
        }
        h
    }

    #[test]
    fn test_analyze_reports_every_directional_analyzer() {
        let engine = PredictionEngine::new(&EngineConfig::default());
        let kinds: Vec<_> = engine
            .analyze(&history_of(&[H, L, H]))
            .into_iter()
            .map(|(k, _)| k)
            .collect();
        assert_eq!(
            kinds,
            vec![
                AnalyzerKind::Streak,
                AnalyzerKind::Markov,
                AnalyzerKind::Balance,
                AnalyzerKind::Pattern,
                AnalyzerKind::ScoreTrend,
            ]
        );
    }

    #[test]
    fn test_long_streak_regime_breaks_the_run() {
        let engine = PredictionEngine::new(&EngineConfig::default());
        let mut seq = vec![H, L, H, L, L, H, L, H, H, L, H, L, L, H];
        seq.extend([L; 7]);
        let p = engine.predict(&history_of(&seq));
        assert_eq!(p.regime, Some(Regime::LongStreak));
        assert_eq!(p.label, PredictedLabel::High);
        assert!(p.confidence > 0.0);
    }

    #[test]
    fn test_alternation_is_choppy() {
        let engine = PredictionEngine::new(&EngineConfig::default());
        let seq: Vec<_> = (0..30).map(|i| if i % 2 == 0 { H } else { L }).collect();
        let p = engine.predict(&history_of(&seq));
        assert_eq!(p.regime, Some(Regime::Choppy));
        // Markov and pattern both say the alternation continues: last is L.
        assert_eq!(p.label, PredictedLabel::High);
    }

    #[test]
    fn test_predict_on_empty_history_is_unknown() {
        let engine = PredictionEngine::new(&EngineConfig::default());
        let p = engine.predict(&RoundHistory::new(10));
        assert_eq!(p.label, PredictedLabel::Unknown);
        assert_eq!(p.confidence, 0.0);
    }

    #[test]
    fn test_any_history_yields_bounded_prediction() {
        let mut rng = StdRng::seed_from_u64(2024);
        let engines = [
            PredictionEngine::new(&EngineConfig::default()),
            PredictionEngine::with_fallback(
                &EngineConfig::default(),
                Box::new(CoinFlip::seeded(9)),
            ),
        ];
        for _ in 0..300 {
            let len = rng.random_range(0..120);
            let mut h = RoundHistory::new(rng.random_range(1..80));
            for _ in 0..len {
                let total = rng.random_range(3..=18);
                h.append(RoundRecord::from_total(total).unwrap());
            }
            for engine in &engines {
                let p = engine.predict(&h);
                assert!((0.0..=100.0).contains(&p.confidence), "{}", p.confidence);
                if h.is_empty() {
                    assert_eq!(p.label, PredictedLabel::Unknown);
                } else {
                    assert_ne!(p.label, PredictedLabel::Unknown);
                }
            }
        }
    }
}
