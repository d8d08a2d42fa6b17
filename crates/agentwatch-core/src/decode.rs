//! Inbound frame decoding: heartbeat replies and typed envelopes.
//!
//! Decode failures are isolated per-frame. A bad frame must never close
//! the connection or disturb state derived from earlier frames, so the
//! decoder only ever reports an error for the single frame it was given.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::MonitorEvent;

/// Heartbeat sentinel sent by the client while the link is open.
pub const PING_FRAME: &str = "ping";
/// Heartbeat reply sentinel. Dropped before decoding; never logged,
/// never stored.
pub const PONG_FRAME: &str = "pong";

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Wire envelope distinguishing a full snapshot from an incremental update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    /// Replayed history, sent once after (re)connection. Authoritative:
    /// fully replaces the current log and projections.
    Init { events: Vec<MonitorEvent> },
    /// One live event to append.
    Event { event: MonitorEvent },
}

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Heartbeat reply; discard.
    Pong,
    Envelope(Envelope),
}

/// Parse a raw text frame into a [`Frame`].
///
/// Extracted from the transport driver so it can be unit-tested without
/// a live socket connection.
pub fn decode_frame(raw: &str) -> Result<Frame, DecodeError> {
    if raw == PONG_FRAME {
        return Ok(Frame::Pong);
    }
    let envelope: Envelope = serde_json::from_str(raw)?;
    Ok(Frame::Envelope(envelope))
}

// ─── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pong_sentinel_is_not_an_error_and_not_an_envelope() {
        let frame = decode_frame(PONG_FRAME).unwrap();
        assert_eq!(frame, Frame::Pong);
    }

    #[test]
    fn decodes_init_envelope() {
        let json = r#"{"type":"init","events":[
            {"type":"AgentActivated","timestamp":100,"data":{"agentId":"a-1"}},
            {"type":"CommandStart","timestamp":200,"data":{"command":"build"}}
        ]}"#;
        let Frame::Envelope(Envelope::Init { events }) = decode_frame(json).unwrap() else {
            panic!("expected init envelope");
        };
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, "AgentActivated");
        assert_eq!(events[1].timestamp, 200);
    }

    #[test]
    fn decodes_event_envelope() {
        let json = r#"{"type":"event","event":{"type":"CommandComplete","timestamp":1500,"data":{}}}"#;
        let Frame::Envelope(Envelope::Event { event }) = decode_frame(json).unwrap() else {
            panic!("expected event envelope");
        };
        assert_eq!(event.kind, "CommandComplete");
        assert_eq!(event.timestamp, 1500);
    }

    #[test]
    fn decodes_init_with_empty_batch() {
        let frame = decode_frame(r#"{"type":"init","events":[]}"#).unwrap();
        assert_eq!(frame, Frame::Envelope(Envelope::Init { events: vec![] }));
    }

    #[test]
    fn garbage_is_a_decode_error() {
        assert!(decode_frame("not json at all").is_err());
    }

    #[test]
    fn unknown_envelope_type_is_a_decode_error() {
        assert!(decode_frame(r#"{"type":"snapshot","events":[]}"#).is_err());
    }

    #[test]
    fn missing_payload_is_a_decode_error() {
        assert!(decode_frame(r#"{"type":"event"}"#).is_err());
    }

    #[test]
    fn envelope_roundtrips() {
        let envelope = Envelope::Event {
            event: MonitorEvent {
                kind: "CommandStart".into(),
                timestamp: 1000,
                data: serde_json::Map::new(),
            },
        };
        let text = serde_json::to_string(&envelope).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["type"], "event");
        assert_eq!(parsed["event"]["type"], "CommandStart");
        assert_eq!(decode_frame(&text).unwrap(), Frame::Envelope(envelope));
    }
}
