// =============================================================================
// Prediction Outcome — Auditable record of every resolved prediction
// =============================================================================
//
// One entry per scored call: what was published, what actually happened,
// and whether the call was right. UNKNOWN calls are never scored and never
// produce an entry.
// =============================================================================

use serde::Serialize;

use crate::session::Resolution;
use crate::types::{Outcome, PredictedLabel};

/// Complete auditable record of one resolved prediction.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionOutcome {
    /// Unique identifier for this entry (UUID v4).
    pub id: String,

    /// Published label ("HIGH" / "LOW").
    pub predicted: PredictedLabel,

    /// Published confidence, 0-100.
    pub confidence: f64,

    pub actual: Outcome,

    /// Dice total of the round that resolved the call.
    pub actual_total: u8,

    /// Feed session id of the resolving round.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<u64>,

    pub correct: bool,

    /// ISO 8601 timestamp of when the call was resolved.
    pub resolved_at: String,
}

impl PredictionOutcome {
    pub fn from_resolution(resolution: &Resolution) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            predicted: resolution.predicted,
            confidence: resolution.confidence,
            actual: resolution.actual.outcome,
            actual_total: resolution.actual.total,
            session: resolution.actual.session,
            correct: resolution.correct,
            resolved_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RoundRecord;

    #[test]
    fn test_from_resolution_copies_round_details() {
        let actual = RoundRecord::from_dice([Some(6), Some(6), Some(1)], Some(77)).unwrap();
        let resolution = Resolution {
            predicted: PredictedLabel::Low,
            confidence: 62.0,
            actual,
            correct: false,
        };
        let entry = PredictionOutcome::from_resolution(&resolution);
        assert_eq!(entry.actual, Outcome::High);
        assert_eq!(entry.actual_total, 13);
        assert_eq!(entry.session, Some(77));
        assert!(!entry.correct);
        assert!(uuid::Uuid::parse_str(&entry.id).is_ok());
    }

    #[test]
    fn test_ids_are_unique() {
        let resolution = Resolution {
            predicted: PredictedLabel::High,
            confidence: 40.0,
            actual: RoundRecord::from_total(12).unwrap(),
            correct: true,
        };
        let a = PredictionOutcome::from_resolution(&resolution);
        let b = PredictionOutcome::from_resolution(&resolution);
        assert_ne!(a.id, b.id);
        let json = serde_json::to_value(&a).unwrap();
        assert_eq!(json["predicted"], "HIGH");
        assert!(json.get("session").is_none());
    }
}
