//! Messages carried by the transport.

use chrono::{DateTime, Utc};
use classpulse_iggy::Partitionable;
use serde::{Deserialize, Serialize};

use crate::event::EventPayload;

/// Wrapper published for every queued event.
///
/// `event_type` duplicates the payload's discriminator so consumers can
/// filter without decoding the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub event_id: String,
    pub event_type: String,
    pub session_id: String,
    /// When the envelope was published, not when the event happened.
    pub timestamp: DateTime<Utc>,
    pub payload: EventPayload,
}

impl EventEnvelope {
    pub fn new(
        event_id: impl Into<String>,
        event_type: impl Into<String>,
        session_id: impl Into<String>,
        payload: EventPayload,
    ) -> Self {
        Self {
            event_id: event_id.into(),
            event_type: event_type.into(),
            session_id: session_id.into(),
            timestamp: Utc::now(),
            payload,
        }
    }

    /// Envelope whose header fields come from the payload itself.
    pub fn for_payload(payload: EventPayload) -> Self {
        Self::new(
            payload.event_id.clone(),
            payload.event_type.clone(),
            payload.session_id.clone(),
            payload,
        )
    }
}

impl Partitionable for EventEnvelope {
    fn partition_key(&self) -> Option<&str> {
        (!self.session_id.is_empty()).then_some(self.session_id.as_str())
    }
}

/// An envelope the consumer could not process, kept for inspection or replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub envelope: EventEnvelope,
    pub error: String,
    pub failed_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(envelope: EventEnvelope, error: impl ToString) -> Self {
        Self {
            envelope,
            error: error.to_string(),
            failed_at: Utc::now(),
        }
    }
}

impl Partitionable for DeadLetter {
    fn partition_key(&self) -> Option<&str> {
        self.envelope.partition_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventType;

    fn payload(session: &str) -> EventPayload {
        EventPayload::new(EventType::SessionStarted, "evt-1", session, Utc::now())
    }

    #[test]
    fn envelope_is_keyed_by_session() {
        let envelope = EventEnvelope::for_payload(payload("session-42"));
        assert_eq!(envelope.partition_key(), Some("session-42"));
        assert_eq!(envelope.event_type, "SESSION_STARTED");
    }

    #[test]
    fn envelope_without_session_has_no_key() {
        let envelope = EventEnvelope::for_payload(payload(""));
        assert_eq!(envelope.partition_key(), None);
    }

    #[test]
    fn envelope_json_carries_header_fields() {
        let envelope = EventEnvelope::for_payload(payload("session-42"));
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["event_id"], "evt-1");
        assert_eq!(json["session_id"], "session-42");
        assert_eq!(json["payload"]["event_type"], "SESSION_STARTED");
    }
}
