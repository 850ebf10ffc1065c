//! Session admission control
//!
//! Enforces at most one live session per conversation and exclusive use of
//! the local media resource. Like the capability cache this is plain owned
//! state; the coordinator task is its only writer.

use crate::domain::session::entity::SessionState;
use crate::domain::session::value_object::{Direction, Phase, ReleaseReason};
use crate::domain::shared::value_objects::{ConversationId, PeerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Process-wide exclusivity flag for the local media device
#[derive(Debug, Clone)]
pub struct MediaResourceLock {
    holder: Option<ConversationId>,
    enforced: bool,
}

impl MediaResourceLock {
    pub fn new(enforced: bool) -> Self {
        Self {
            holder: None,
            enforced,
        }
    }

    pub fn holder(&self) -> Option<&ConversationId> {
        self.holder.as_ref()
    }

    pub fn is_held(&self) -> bool {
        self.holder.is_some()
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced
    }

    fn try_acquire(&mut self, conversation: &ConversationId) -> Result<(), ConversationId> {
        if !self.enforced {
            return Ok(());
        }
        match &self.holder {
            Some(holder) if holder != conversation => Err(holder.clone()),
            _ => {
                self.holder = Some(conversation.clone());
                Ok(())
            }
        }
    }

    fn release(&mut self, conversation: &ConversationId) -> bool {
        if self.holder.as_ref() == Some(conversation) {
            self.holder = None;
            true
        } else {
            false
        }
    }
}

impl Default for MediaResourceLock {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Grant to proceed with a call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permit {
    pub conversation_id: ConversationId,
    pub direction: Direction,
    pub phase: Phase,
    /// Whether this permit took the media lock
    pub holds_media: bool,
}

/// Why admission was refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    /// Another conversation is using the local media device
    MediaBusy { holder: ConversationId },
    /// The conversation already has a live session
    SessionExists { phase: Phase },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    Permit(Permit),
    Denied(Denial),
}

impl Admission {
    pub fn is_permit(&self) -> bool {
        matches!(self, Admission::Permit(_))
    }
}

pub struct AdmissionControl {
    sessions: HashMap<ConversationId, SessionState>,
    media: MediaResourceLock,
}

impl AdmissionControl {
    pub fn new(exclusive_media: bool) -> Self {
        Self {
            sessions: HashMap::new(),
            media: MediaResourceLock::new(exclusive_media),
        }
    }

    /// Admit a new session for `conversation`, or explain why not
    ///
    /// On permit the session is created and the media lock taken in the same
    /// step, so no caller can observe one without the other.
    pub fn try_acquire(
        &mut self,
        conversation: &ConversationId,
        peer: &PeerId,
        direction: Direction,
    ) -> Admission {
        if let Some(existing) = self.sessions.get(conversation) {
            debug!(
                "Denied {:?} session for {}: already {}",
                direction,
                conversation,
                existing.phase().as_str()
            );
            return Admission::Denied(Denial::SessionExists {
                phase: existing.phase(),
            });
        }

        if let Err(holder) = self.media.try_acquire(conversation) {
            debug!(
                "Denied {:?} session for {}: media held by {}",
                direction, conversation, holder
            );
            return Admission::Denied(Denial::MediaBusy { holder });
        }

        let session = SessionState::new(conversation.clone(), peer.clone(), direction);
        let phase = session.phase();
        self.sessions.insert(conversation.clone(), session);

        Admission::Permit(Permit {
            conversation_id: conversation.clone(),
            direction,
            phase,
            holds_media: self.media.is_enforced(),
        })
    }

    /// Release a session and its media lock
    ///
    /// Returns the final state of the session, or `None` if there was nothing
    /// to release. Releasing twice is a no-op.
    pub fn release(
        &mut self,
        conversation: &ConversationId,
        reason: ReleaseReason,
    ) -> Option<SessionState> {
        let mut session = self.sessions.remove(conversation)?;
        let phase = reason.final_phase(session.phase());
        session.finish(phase);

        if self.media.is_enforced() && !self.media.release(conversation) {
            warn!("Session {} released without holding the media lock", conversation);
        }

        Some(session)
    }

    /// Release every session, returning their final states
    pub fn release_all(&mut self, reason: ReleaseReason) -> Vec<SessionState> {
        let conversations: Vec<ConversationId> = self.sessions.keys().cloned().collect();
        conversations
            .iter()
            .filter_map(|conversation| self.release(conversation, reason.clone()))
            .collect()
    }

    pub fn get(&self, conversation: &ConversationId) -> Option<&SessionState> {
        self.sessions.get(conversation)
    }

    pub fn get_mut(&mut self, conversation: &ConversationId) -> Option<&mut SessionState> {
        self.sessions.get_mut(conversation)
    }

    pub fn sessions_mut(&mut self) -> impl Iterator<Item = &mut SessionState> {
        self.sessions.values_mut()
    }

    pub fn media_holder(&self) -> Option<&ConversationId> {
        self.media.holder()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

impl Default for AdmissionControl {
    fn default() -> Self {
        Self::new(true)
    }
}
