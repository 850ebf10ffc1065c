//! Collaborator ports
//!
//! The signaling channel and the media provider are defined here as traits
//! (ports) and implemented outside the domain layer (adapters).

use crate::domain::shared::error::Result;
use crate::domain::shared::value_objects::{ConversationId, PeerId, RequestHandle, SessionHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Presence-and-messaging service the coordinator negotiates over
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SignalingChannel: Send + Sync {
    /// Ask a peer whether it advertises `feature`
    async fn discover_capability(&self, peer: &PeerId, feature: &str) -> Result<bool>;

    /// Open a new outgoing call session
    async fn create_outgoing_session(&self, peer: &PeerId) -> Result<SessionHandle>;

    /// Decline an inbound request so the caller gets a clean refusal
    async fn reject_incoming_session(&self, request: RequestHandle) -> Result<()>;

    /// Advertise a local feature to the service
    async fn announce_feature(&self, feature: &str) -> Result<()>;
}

/// Local media device, seen only through acquisition and release
pub trait MediaResource: Send + Sync {
    fn acquired(&self, conversation: &ConversationId);

    fn released(&self, conversation: &ConversationId);
}

/// Media provider that ignores lock notifications
#[derive(Debug, Default, Clone, Copy)]
pub struct DetachedMedia;

impl MediaResource for DetachedMedia {
    fn acquired(&self, _conversation: &ConversationId) {}

    fn released(&self, _conversation: &ConversationId) {}
}

/// Presence change as reported by the channel
///
/// `from` is the raw address; malformed addresses are ignored downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub from: String,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionEvent {
    Connected,
    Authenticated,
    Closed,
    ClosedOnError(String),
}

/// Inbound call request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncomingSessionRequest {
    pub request: RequestHandle,
    pub from: PeerId,
    pub conversation_id: ConversationId,
}

/// Notification pushed by the channel's I/O layer into the coordinator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum SignalingEvent {
    Presence(PresenceUpdate),
    Connection(ConnectionEvent),
    IncomingSession(IncomingSessionRequest),
}
