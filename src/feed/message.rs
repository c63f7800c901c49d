// =============================================================================
// Feed Frames — parse game feed messages into events
// =============================================================================
//
// Frames are JSON arrays whose second element is an object carrying `cmd`:
//
//   [5, { "cmd": 1008, "sid": 123456 }]                       session started
//   [5, { "cmd": 1003, "gBB": true, "d1": 3, "d2": 5, "d3": 6 }]  round finalized
//
// Everything else is ignored. Die values are passed through raw; range
// checks happen when the round record is built.

use serde_json::Value;

pub const CMD_ROUND_RESULT: i64 = 1003;
pub const CMD_SESSION_START: i64 = 1008;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedEvent {
    SessionStarted { session: u64 },
    RoundFinalized {
        dice: [Option<i64>; 3],
        session: Option<u64>,
    },
    Ignored,
}

/// Parse one text frame. Never fails: anything unrecognised is `Ignored`.
pub fn parse_frame(text: &str) -> FeedEvent {
    let Ok(root) = serde_json::from_str::<Value>(text) else {
        return FeedEvent::Ignored;
    };
    let Some(body) = root.as_array().and_then(|a| a.get(1)).filter(|v| v.is_object()) else {
        return FeedEvent::Ignored;
    };

    match body.get("cmd").and_then(as_integer) {
        Some(CMD_SESSION_START) => match body.get("sid").and_then(as_session) {
            Some(session) => FeedEvent::SessionStarted { session },
            None => FeedEvent::Ignored,
        },
        Some(CMD_ROUND_RESULT) if body.get("gBB").is_some_and(is_truthy) => {
            FeedEvent::RoundFinalized {
                dice: [
                    body.get("d1").and_then(as_integer),
                    body.get("d2").and_then(as_integer),
                    body.get("d3").and_then(as_integer),
                ],
                session: body.get("sid").and_then(as_session),
            }
        }
        _ => FeedEvent::Ignored,
    }
}

/// Integers, including whole floats such as `3.0`.
fn as_integer(v: &Value) -> Option<i64> {
    v.as_i64().or_else(|| {
        v.as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    })
}

fn as_session(v: &Value) -> Option<u64> {
    match v {
        Value::String(s) => s.trim().parse().ok(),
        _ => as_integer(v).and_then(|n| u64::try_from(n).ok()),
    }
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_start() {
        assert_eq!(
            parse_frame(r#"[5,{"cmd":1008,"sid":2451177}]"#),
            FeedEvent::SessionStarted { session: 2451177 }
        );
        assert_eq!(
            parse_frame(r#"[5,{"cmd":1008,"sid":"88"}]"#),
            FeedEvent::SessionStarted { session: 88 }
        );
        assert_eq!(parse_frame(r#"[5,{"cmd":1008}]"#), FeedEvent::Ignored);
    }

    #[test]
    fn test_finalized_round() {
        assert_eq!(
            parse_frame(r#"[5,{"cmd":1003,"gBB":1,"d1":3,"d2":5,"d3":6,"sid":7}]"#),
            FeedEvent::RoundFinalized {
                dice: [Some(3), Some(5), Some(6)],
                session: Some(7),
            }
        );
    }

    #[test]
    fn test_round_without_final_flag_is_ignored() {
        assert_eq!(
            parse_frame(r#"[5,{"cmd":1003,"d1":3,"d2":5,"d3":6}]"#),
            FeedEvent::Ignored
        );
        assert_eq!(
            parse_frame(r#"[5,{"cmd":1003,"gBB":false,"d1":3,"d2":5,"d3":6}]"#),
            FeedEvent::Ignored
        );
    }

    #[test]
    fn test_malformed_dice_pass_through_for_validation() {
        match parse_frame(r#"[5,{"cmd":1003,"gBB":true,"d1":"x","d2":9,"d3":2.0}]"#) {
            FeedEvent::RoundFinalized { dice, session } => {
                assert_eq!(dice, [None, Some(9), Some(2)]);
                assert_eq!(session, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_unrelated_frames_are_ignored() {
        for text in [
            "not json",
            "{}",
            "[]",
            "[1]",
            r#"[5,"text"]"#,
            r#"[5,{"cmd":1005}]"#,
            r#"[7,"Simms",1,0]"#,
        ] {
            assert_eq!(parse_frame(text), FeedEvent::Ignored, "{text}");
        }
    }
}
