// =============================================================================
// Shared types used across the HiLo prediction engine
// =============================================================================

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lowest possible three-die total.
pub const MIN_TOTAL: u8 = 3;
/// Highest possible three-die total.
pub const MAX_TOTAL: u8 = 18;
/// Totals strictly above this value are HIGH.
pub const HIGH_ABOVE: u8 = 10;

// =============================================================================
// Outcome
// =============================================================================

/// Binary outcome of a finalized round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    High,
    Low,
}

impl Outcome {
    /// The only place the HIGH/LOW boundary is expressed: `total > 10`,
    /// which for integer totals is the same as `total >= 11`.
    pub fn from_total(total: u8) -> Self {
        if total > HIGH_ABOVE {
            Self::High
        } else {
            Self::Low
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
        }
    }

    /// Single-character code used in pattern strings (T = high, X = low).
    pub fn code(self) -> char {
        match self {
            Self::High => 'T',
            Self::Low => 'X',
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

// =============================================================================
// PredictedLabel
// =============================================================================

/// Label carried by a published prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PredictedLabel {
    High,
    Low,
    Unknown,
}

impl PredictedLabel {
    pub fn as_outcome(self) -> Option<Outcome> {
        match self {
            Self::High => Some(Outcome::High),
            Self::Low => Some(Outcome::Low),
            Self::Unknown => None,
        }
    }

    /// Flip HIGH and LOW; UNKNOWN stays UNKNOWN.
    pub fn inverted(self) -> Self {
        match self {
            Self::High => Self::Low,
            Self::Low => Self::High,
            Self::Unknown => Self::Unknown,
        }
    }
}

impl From<Outcome> for PredictedLabel {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::High => Self::High,
            Outcome::Low => Self::Low,
        }
    }
}

impl std::fmt::Display for PredictedLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::High => write!(f, "HIGH"),
            Self::Low => write!(f, "LOW"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// =============================================================================
// RoundError
// =============================================================================

/// Rejection reasons for a malformed finalized round.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoundError {
    #[error("die {index} is missing or not an integer")]
    MissingDie { index: usize },

    #[error("die {index} has value {value}, expected 1..=6")]
    DieOutOfRange { index: usize, value: i64 },

    #[error("total {total} is outside 3..=18")]
    TotalOutOfRange { total: i64 },
}

// =============================================================================
// RoundRecord
// =============================================================================

/// One finalized round. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub total: u8,
    pub outcome: Outcome,
    /// Die faces, when the round was built from dice.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dice: Option<[u8; 3]>,
    /// Feed session id of the round that finalized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<u64>,
}

impl RoundRecord {
    /// Build a record from a bare total in `3..=18`.
    pub fn from_total(total: i64) -> Result<Self, RoundError> {
        if total < i64::from(MIN_TOTAL) || total > i64::from(MAX_TOTAL) {
            return Err(RoundError::TotalOutOfRange { total });
        }
        let total = total as u8;
        Ok(Self {
            total,
            outcome: Outcome::from_total(total),
            dice: None,
            session: None,
        })
    }

    /// Build a record from three raw die values as they arrive from the feed.
    /// `None` means the value was absent or not an integer.
    pub fn from_dice(dice: [Option<i64>; 3], session: Option<u64>) -> Result<Self, RoundError> {
        let mut faces = [0u8; 3];
        for (index, raw) in dice.iter().enumerate() {
            let value = raw.ok_or(RoundError::MissingDie { index: index + 1 })?;
            if !(1..=6).contains(&value) {
                return Err(RoundError::DieOutOfRange {
                    index: index + 1,
                    value,
                });
            }
            faces[index] = value as u8;
        }
        let total = faces.iter().sum::<u8>();
        Ok(Self {
            total,
            outcome: Outcome::from_total(total),
            dice: Some(faces),
            session,
        })
    }

    /// Shorthand for tests and fixtures: a round with the given outcome and a
    /// representative total.
    #[cfg(test)]
    pub fn of(outcome: Outcome) -> Self {
        let total = match outcome {
            Outcome::High => 14,
            Outcome::Low => 7,
        };
        Self {
            total,
            outcome,
            dice: None,
            session: None,
        }
    }
}

#[cfg(test)]
pub fn rounds_of(outcomes: &[Outcome]) -> Vec<RoundRecord> {
    outcomes.iter().copied().map(RoundRecord::of).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boundary_is_strictly_above_ten() {
        assert_eq!(Outcome::from_total(10), Outcome::Low);
        assert_eq!(Outcome::from_total(11), Outcome::High);
        assert_eq!(Outcome::from_total(3), Outcome::Low);
        assert_eq!(Outcome::from_total(18), Outcome::High);
    }

    #[test]
    fn test_from_dice_valid() {
        let r = RoundRecord::from_dice([Some(6), Some(4), Some(1)], Some(42)).unwrap();
        assert_eq!(r.total, 11);
        assert_eq!(r.outcome, Outcome::High);
        assert_eq!(r.dice, Some([6, 4, 1]));
        assert_eq!(r.session, Some(42));
    }

    #[test]
    fn test_from_dice_missing_die() {
        let err = RoundRecord::from_dice([Some(3), None, Some(2)], None).unwrap_err();
        assert_eq!(err, RoundError::MissingDie { index: 2 });
    }

    #[test]
    fn test_from_dice_out_of_range() {
        let err = RoundRecord::from_dice([Some(0), Some(3), Some(2)], None).unwrap_err();
        assert_eq!(err, RoundError::DieOutOfRange { index: 1, value: 0 });
        let err = RoundRecord::from_dice([Some(1), Some(3), Some(7)], None).unwrap_err();
        assert_eq!(err, RoundError::DieOutOfRange { index: 3, value: 7 });
    }

    #[test]
    fn test_from_total_range() {
        assert!(RoundRecord::from_total(2).is_err());
        assert!(RoundRecord::from_total(19).is_err());
        assert_eq!(RoundRecord::from_total(10).unwrap().outcome, Outcome::Low);
    }

    #[test]
    fn test_label_inversion() {
        assert_eq!(PredictedLabel::High.inverted(), PredictedLabel::Low);
        assert_eq!(PredictedLabel::Unknown.inverted(), PredictedLabel::Unknown);
        assert_eq!(PredictedLabel::from(Outcome::Low), PredictedLabel::Low);
    }

    #[test]
    fn test_outcome_serialises_uppercase() {
        assert_eq!(serde_json::to_string(&Outcome::High).unwrap(), "\"HIGH\"");
        assert_eq!(
            serde_json::to_string(&PredictedLabel::Unknown).unwrap(),
            "\"UNKNOWN\""
        );
    }
}
