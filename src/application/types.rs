//! Typed results exposed to callers of the coordinator

use crate::domain::capability::CapabilityStatus;
use crate::domain::session::{Denial, Direction, Phase, SessionState};
use crate::domain::shared::value_objects::{ConversationId, PeerId, RequestHandle, SessionHandle};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Result of `request_outgoing_call`
///
/// Everything except a signaling failure is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OutgoingCallOutcome {
    Placed { handle: SessionHandle },
    Denied { denial: Denial },
    Unsupported,
    TimedOut,
    /// The call was ended before the session was created
    Cancelled,
}

/// Result of routing an inbound request through admission control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IncomingCallOutcome {
    Accepted,
    Rejected { denial: Denial },
}

/// Call action offered for a peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallAction {
    pub peer: PeerId,
    pub label: String,
}

impl CallAction {
    pub fn computer_to_computer(peer: PeerId) -> Self {
        Self {
            peer,
            label: "Computer to computer".to_string(),
        }
    }
}

/// Published whenever a discovery resolves a peer's capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityUpdate {
    pub peer: PeerId,
    pub status: CapabilityStatus,
}

/// Read-only view of a live session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub conversation_id: ConversationId,
    pub peer_id: PeerId,
    pub direction: Direction,
    pub phase: Phase,
    pub started_at: DateTime<Utc>,
    pub handle: Option<SessionHandle>,
    /// Inbound request an incoming session was admitted from
    pub request: Option<RequestHandle>,
}

impl From<&SessionState> for SessionSnapshot {
    fn from(session: &SessionState) -> Self {
        Self {
            conversation_id: session.conversation_id().clone(),
            peer_id: session.peer_id().clone(),
            direction: session.direction(),
            phase: session.phase(),
            started_at: session.started_at(),
            handle: session.handle(),
            request: session.request(),
        }
    }
}
