// =============================================================================
// Ensemble Module
// =============================================================================
//
// Turns the analyzer bank's individual calls into one prediction:
// - Regime-aware weighted scoring with an injectable weight configuration
// - Fallback strategies for rounds where no analyzer fires

pub mod fallback;
pub mod weighted_score;

pub use fallback::{CoinFlip, FallbackMode, FallbackStrategy, FollowLastOutcome};
pub use weighted_score::{Contribution, EnsembleConfig, PredictionRecord, WeightedCombiner};
