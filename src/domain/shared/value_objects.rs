//! Shared value objects used across multiple bounded contexts

use super::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Peer identity at bare-address granularity (`user@host`)
///
/// Any resource part (`/desktop`) is stripped on construction, so every
/// device of the same account maps to one capability entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    pub fn parse(address: &str) -> Result<Self, DomainError> {
        let bare = address.trim().split('/').next().unwrap_or_default();

        if bare.is_empty() {
            return Err(DomainError::InvalidPeerId(address.to_string()));
        }

        Ok(Self(bare.to_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Domain part of the address, if any
    pub fn domain(&self) -> &str {
        match self.0.split_once('@') {
            Some((_, domain)) => domain,
            None => &self.0,
        }
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Conversation (chat room or peer pairing) a call is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(String);

impl ConversationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&PeerId> for ConversationId {
    fn from(peer: &PeerId) -> Self {
        Self(peer.as_str().to_string())
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of a session created through the signaling channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(Uuid);

impl SessionHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle of an inbound session request, used to accept or reject it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestHandle(Uuid);

impl RequestHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RequestHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RequestHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_peer_id_strips_resource() {
        let peer = PeerId::parse("Alice@Example.com/desktop").unwrap();
        assert_eq!(peer.as_str(), "alice@example.com");
        assert_eq!(peer.domain(), "example.com");

        let same = PeerId::parse("alice@example.com").unwrap();
        assert_eq!(peer, same);
    }

    #[test]
    fn test_peer_id_rejects_empty() {
        assert!(PeerId::parse("").is_err());
        assert!(PeerId::parse("   ").is_err());
        assert!(PeerId::parse("/resource").is_err());
    }

    #[test]
    fn test_conversation_from_peer() {
        let peer = PeerId::parse("bob@example.com/phone").unwrap();
        let conversation = ConversationId::from(&peer);
        assert_eq!(conversation.to_string(), "bob@example.com");
    }
}
