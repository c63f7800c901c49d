// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Coarse classification of recent sequence behaviour from two inputs:
// - the streak analyzer's reading of the tail run
// - the volatility (switch fraction) of the recent window

pub mod detector;

pub use detector::{ContextClassifier, Regime};
