//! Session value objects

use serde::{Deserialize, Serialize};

/// Who initiated the call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Negotiation phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    /// Waiting for the peer's capability to resolve
    Discovering,
    /// Session requested or offered, not yet confirmed
    Negotiating,
    Active,
    Rejected,
    TimedOut,
}

impl Phase {
    /// Phase a freshly admitted session starts in
    pub fn initial(direction: Direction) -> Self {
        match direction {
            Direction::Outgoing => Phase::Discovering,
            Direction::Incoming => Phase::Negotiating,
        }
    }

    /// Check if state transition is valid
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;

        match (self, next) {
            (Idle, Discovering) | (Idle, Negotiating) => true,

            (Discovering, Negotiating) => true,
            (Discovering, Rejected) | (Discovering, TimedOut) => true,

            (Negotiating, Active) => true,
            (Negotiating, Rejected) | (Negotiating, TimedOut) => true,

            (Rejected, _) | (TimedOut, _) => false,

            _ => false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Rejected | Phase::TimedOut)
    }

    /// Phases bounded by the negotiation watchdog
    pub fn is_pending(&self) -> bool {
        matches!(self, Phase::Discovering | Phase::Negotiating)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Phase::Idle => "idle",
            Phase::Discovering => "discovering",
            Phase::Negotiating => "negotiating",
            Phase::Active => "active",
            Phase::Rejected => "rejected",
            Phase::TimedOut => "timed_out",
        }
    }
}

/// Why a session was released
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleaseReason {
    /// Call ended normally
    Completed,
    /// Peer lacks call support or declined
    Rejected,
    /// Negotiation watchdog expired
    TimedOut,
    /// Signaling failure while setting up
    Failed(String),
    /// Signaling connection closed
    Disconnected,
}

impl ReleaseReason {
    /// Terminal phase recorded for the released session
    pub fn final_phase(&self, current: Phase) -> Phase {
        match self {
            ReleaseReason::Completed if current == Phase::Active => Phase::Active,
            // Hung up before the call was established
            ReleaseReason::Completed => Phase::Rejected,
            ReleaseReason::TimedOut => Phase::TimedOut,
            ReleaseReason::Rejected | ReleaseReason::Failed(_) | ReleaseReason::Disconnected => {
                Phase::Rejected
            }
        }
    }
}
