//! Mirror message types.
//!
//! A mirror serves topic messages as JSON records carrying the consensus
//! timestamp and the base64-encoded UTF-8 JSON of the event.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use ledgerline_core::{
    validate_event, ConsensusTimestamp, CoreError, Event, LoggedEvent,
};

use crate::error::DecodeError;

/// A message as served by the mirror, before decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    /// Ledger-assigned ordering key, `seconds.nanoseconds`.
    pub consensus_timestamp: String,

    /// Base64 (standard alphabet) of the UTF-8 JSON event.
    pub message: String,

    /// Topic sequence number, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sequence_number: Option<u64>,
}

impl RawMessage {
    /// Encode an event as a mirror message.
    pub fn encode(
        consensus_timestamp: ConsensusTimestamp,
        sequence_number: Option<u64>,
        event: &Event,
    ) -> Result<Self, CoreError> {
        let wire = event.to_wire()?;
        Ok(Self {
            consensus_timestamp: consensus_timestamp.to_string(),
            message: STANDARD.encode(wire),
            sequence_number,
        })
    }

    /// Build a message from arbitrary payload bytes.
    pub fn from_bytes(consensus_timestamp: ConsensusTimestamp, payload: &[u8]) -> Self {
        Self {
            consensus_timestamp: consensus_timestamp.to_string(),
            message: STANDARD.encode(payload),
            sequence_number: None,
        }
    }

    /// Parse only the consensus timestamp.
    pub fn consensus(&self) -> Result<ConsensusTimestamp, DecodeError> {
        Ok(self.consensus_timestamp.trim().parse()?)
    }

    /// Decode into a validated, logged event.
    ///
    /// Steps: consensus timestamp, base64, UTF-8, JSON, event shape,
    /// ingestion validation. The first failing step is reported.
    pub fn decode(&self) -> Result<LoggedEvent, DecodeError> {
        let consensus = self.consensus()?;

        let bytes = STANDARD
            .decode(self.message.trim())
            .map_err(|e| DecodeError::Base64(e.to_string()))?;
        let text = std::str::from_utf8(&bytes).map_err(|_| DecodeError::Utf8)?;
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| DecodeError::Json(e.to_string()))?;

        let event = Event::from_wire_value(value).map_err(|e| match e {
            CoreError::Validation(v) => DecodeError::Shape(v.to_string()),
            other => DecodeError::Shape(other.to_string()),
        })?;
        validate_event(&event)?;

        let mut logged = LoggedEvent::new(consensus, event);
        logged.sequence_number = self.sequence_number;
        Ok(logged)
    }
}

/// Pagination links in a mirror response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default)]
    pub next: Option<String>,
}

/// One page of a mirror's topic message listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorPage {
    #[serde(default)]
    pub messages: Vec<RawMessage>,

    #[serde(default)]
    pub links: Links,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledgerline_core::{EventBuilder, EventKind};

    fn ts(s: &str) -> ConsensusTimestamp {
        s.parse().unwrap()
    }

    fn sample() -> Event {
        EventBuilder::new(EventKind::ApplicationCreated)
            .timestamp(1_700_000_000_000)
            .field("applicationId", "A1")
            .field("amount", 500)
            .build()
    }

    #[test]
    fn test_encode_decode() {
        let raw = RawMessage::encode(ts("10.5"), Some(7), &sample()).unwrap();
        assert_eq!(raw.consensus_timestamp, "10.500000000");
        let logged = raw.decode().unwrap();
        assert_eq!(logged.consensus_timestamp, ts("10.5"));
        assert_eq!(logged.sequence_number, Some(7));
        assert_eq!(logged.event, sample());
    }

    #[test]
    fn test_decode_bad_timestamp() {
        let mut raw = RawMessage::encode(ts("1"), None, &sample()).unwrap();
        raw.consensus_timestamp = "soon".into();
        assert!(matches!(raw.decode(), Err(DecodeError::Timestamp(_))));
    }

    #[test]
    fn test_decode_bad_base64() {
        let raw = RawMessage {
            consensus_timestamp: "1.0".into(),
            message: "***".into(),
            sequence_number: None,
        };
        assert!(matches!(raw.decode(), Err(DecodeError::Base64(_))));
    }

    #[test]
    fn test_decode_bad_utf8() {
        let raw = RawMessage::from_bytes(ts("1"), &[0xff, 0xfe, 0x00]);
        assert_eq!(raw.decode(), Err(DecodeError::Utf8));
    }

    #[test]
    fn test_decode_bad_json() {
        let raw = RawMessage::from_bytes(ts("1"), b"{\"type\":");
        assert!(matches!(raw.decode(), Err(DecodeError::Json(_))));
    }

    #[test]
    fn test_decode_bad_shape() {
        let raw = RawMessage::from_bytes(ts("1"), b"[1,2,3]");
        assert!(matches!(raw.decode(), Err(DecodeError::Shape(_))));
        let raw = RawMessage::from_bytes(ts("1"), b"{\"timestamp\":1}");
        assert!(matches!(raw.decode(), Err(DecodeError::Shape(_))));
    }

    #[test]
    fn test_decode_fails_validation() {
        let raw = RawMessage::from_bytes(
            ts("1"),
            br#"{"type":"DecisionOverridden","payload":{"applicationId":"A1"},"timestamp":1}"#,
        );
        assert!(matches!(raw.decode(), Err(DecodeError::Validation(_))));
    }

    #[test]
    fn test_decode_flat_legacy_message() {
        let raw = RawMessage::from_bytes(
            ts("2"),
            br#"{"type":"ApplicationCreated","applicationId":"A1","amount":500,"timestamp":1700000000000}"#,
        );
        let logged = raw.decode().unwrap();
        assert_eq!(logged.event, sample());
    }

    #[test]
    fn test_mirror_page_ignores_extra_fields() {
        let body = r#"{
            "messages": [{
                "chunk_info": null,
                "consensus_timestamp": "1700000000.000000001",
                "message": "e30=",
                "payer_account_id": "0.0.2",
                "running_hash": "abc",
                "sequence_number": 1,
                "topic_id": "0.0.4512"
            }],
            "links": {"next": null}
        }"#;
        let page: MirrorPage = serde_json::from_str(body).unwrap();
        assert_eq!(page.messages.len(), 1);
        assert_eq!(page.messages[0].sequence_number, Some(1));
        assert_eq!(page.links.next, None);
    }
}
