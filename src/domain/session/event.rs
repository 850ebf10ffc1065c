//! Session domain events

use crate::domain::session::admission::Denial;
use crate::domain::session::value_object::Phase;
use crate::domain::shared::value_objects::{ConversationId, PeerId, RequestHandle, SessionHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What happened to a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum CallEventKind {
    /// Outgoing session created through the signaling channel
    Placed { peer: PeerId, handle: SessionHandle },
    /// Incoming request admitted
    Accepted { peer: PeerId, request: RequestHandle },
    /// Incoming request declined by admission control
    IncomingRejected { request: RequestHandle, denial: Denial },
    /// Negotiation confirmed
    Established,
    /// Outgoing session could not be created
    CreationFailed { reason: String },
    /// Peer turned out not to support calls
    Unsupported { peer: PeerId },
    TimedOut { elapsed_secs: u64 },
    /// Session released and removed
    Ended { phase: Phase },
}

/// Session event published to subscribers of the coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEvent {
    pub event_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub conversation_id: ConversationId,
    pub kind: CallEventKind,
}

impl CallEvent {
    pub fn new(conversation_id: ConversationId, kind: CallEventKind) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            occurred_at: Utc::now(),
            conversation_id,
            kind,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self.kind {
            CallEventKind::Placed { .. } => "call.placed",
            CallEventKind::Accepted { .. } => "call.accepted",
            CallEventKind::IncomingRejected { .. } => "call.incoming_rejected",
            CallEventKind::Established => "call.established",
            CallEventKind::CreationFailed { .. } => "call.creation_failed",
            CallEventKind::Unsupported { .. } => "call.unsupported",
            CallEventKind::TimedOut { .. } => "call.timed_out",
            CallEventKind::Ended { .. } => "call.ended",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type() {
        let event = CallEvent::new(
            ConversationId::new("room"),
            CallEventKind::TimedOut { elapsed_secs: 5 },
        );
        assert_eq!(event.event_type(), "call.timed_out");
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = CallEvent::new(
            ConversationId::new("room"),
            CallEventKind::Ended {
                phase: Phase::Rejected,
            },
        );
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["conversation_id"], "room");
        assert_eq!(json["kind"]["type"], "ended");
        assert_eq!(json["kind"]["data"]["phase"], "rejected");
    }
}
