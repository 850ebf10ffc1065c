//! Session entity

use crate::domain::session::value_object::{Direction, Phase};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{ConversationId, PeerId, RequestHandle, SessionHandle};
use crate::domain::watchdog::{NegotiationWatchdog, WatchdogReading};
use chrono::{DateTime, Utc};

/// Live call session of one conversation
#[derive(Debug, Clone)]
pub struct SessionState {
    conversation_id: ConversationId,
    peer_id: PeerId,
    direction: Direction,
    phase: Phase,
    started_at: DateTime<Utc>,
    /// Set once the signaling channel created the session
    handle: Option<SessionHandle>,
    /// Inbound request this session answers, if incoming
    request: Option<RequestHandle>,
    watchdog: Option<NegotiationWatchdog>,
}

impl SessionState {
    pub fn new(conversation_id: ConversationId, peer_id: PeerId, direction: Direction) -> Self {
        Self {
            conversation_id,
            peer_id,
            direction,
            phase: Phase::initial(direction),
            started_at: Utc::now(),
            handle: None,
            request: None,
            watchdog: None,
        }
    }

    pub fn conversation_id(&self) -> &ConversationId {
        &self.conversation_id
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn handle(&self) -> Option<SessionHandle> {
        self.handle
    }

    pub fn request(&self) -> Option<RequestHandle> {
        self.request
    }

    pub fn set_handle(&mut self, handle: SessionHandle) {
        self.handle = Some(handle);
    }

    pub fn set_request(&mut self, request: RequestHandle) {
        self.request = Some(request);
    }

    pub fn transition_to(&mut self, next: Phase) -> Result<()> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidStateTransition(format!(
                "{}: {} -> {}",
                self.conversation_id,
                self.phase.as_str(),
                next.as_str()
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Force a terminal phase during release
    pub(crate) fn finish(&mut self, phase: Phase) {
        self.phase = phase;
        self.watchdog = None;
    }

    /// Start (or restart) the negotiation watchdog
    pub fn arm_watchdog(&mut self, threshold_secs: u64) {
        let mut watchdog = NegotiationWatchdog::new(threshold_secs);
        watchdog.start();
        self.watchdog = Some(watchdog);
    }

    pub fn disarm_watchdog(&mut self) {
        self.watchdog = None;
    }

    pub fn has_watchdog(&self) -> bool {
        self.watchdog.is_some()
    }

    /// Poll the watchdog, if one is armed
    pub fn poll_watchdog(&mut self) -> Option<WatchdogReading> {
        self.watchdog.as_mut().map(|watchdog| watchdog.check())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outgoing() -> SessionState {
        let peer = PeerId::parse("alice@example.com").unwrap();
        SessionState::new(ConversationId::from(&peer), peer, Direction::Outgoing)
    }

    #[test]
    fn test_new_session() {
        let session = outgoing();
        assert_eq!(session.phase(), Phase::Discovering);
        assert_eq!(session.direction(), Direction::Outgoing);
        assert!(session.handle().is_none());
        assert!(!session.has_watchdog());
    }

    #[test]
    fn test_transition() {
        let mut session = outgoing();
        session.transition_to(Phase::Negotiating).unwrap();
        session.transition_to(Phase::Active).unwrap();

        let result = session.transition_to(Phase::Discovering);
        assert!(matches!(result, Err(DomainError::InvalidStateTransition(_))));
        assert_eq!(session.phase(), Phase::Active);
    }

    #[test]
    fn test_finish_disarms_watchdog() {
        let mut session = outgoing();
        session.arm_watchdog(5);
        assert!(session.has_watchdog());

        session.finish(Phase::TimedOut);
        assert_eq!(session.phase(), Phase::TimedOut);
        assert!(session.poll_watchdog().is_none());
    }
}
