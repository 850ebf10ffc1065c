//! Capability entities and value objects

use crate::domain::shared::value_objects::PeerId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Whether a peer supports call negotiation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityStatus {
    Unknown,
    Supported,
    Unsupported,
}

impl CapabilityStatus {
    pub fn as_str(&self) -> &str {
        match self {
            CapabilityStatus::Unknown => "unknown",
            CapabilityStatus::Supported => "supported",
            CapabilityStatus::Unsupported => "unsupported",
        }
    }

    pub fn is_supported(&self) -> bool {
        matches!(self, CapabilityStatus::Supported)
    }
}

impl From<bool> for CapabilityStatus {
    fn from(supported: bool) -> Self {
        if supported {
            CapabilityStatus::Supported
        } else {
            CapabilityStatus::Unsupported
        }
    }
}

/// Logical timestamp of one discovery request
///
/// Tickets are issued from a monotonic counter. A reply is only applied while
/// the entry still carries the ticket it was issued under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiscoveryTicket(u64);

impl DiscoveryTicket {
    pub(crate) fn new(sequence: u64) -> Self {
        Self(sequence)
    }
}

/// Cached capability of a single peer
#[derive(Debug, Clone)]
pub struct PeerCapability {
    pub peer_id: PeerId,
    pub status: CapabilityStatus,
    pub last_updated: DateTime<Utc>,
    /// Outstanding discovery, if one is in flight
    pub in_flight: Option<DiscoveryTicket>,
}

impl PeerCapability {
    pub fn discovering(peer_id: PeerId, ticket: DiscoveryTicket) -> Self {
        Self {
            peer_id,
            status: CapabilityStatus::Unknown,
            last_updated: Utc::now(),
            in_flight: Some(ticket),
        }
    }

    pub fn is_discovering(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Check if the resolved status is older than `ttl`
    pub fn is_stale(&self, ttl: Option<Duration>) -> bool {
        match ttl {
            Some(ttl) => Utc::now() - self.last_updated > ttl,
            None => false,
        }
    }

    pub fn resolve(&mut self, status: CapabilityStatus) {
        self.status = status;
        self.in_flight = None;
        self.last_updated = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_bool() {
        assert_eq!(CapabilityStatus::from(true), CapabilityStatus::Supported);
        assert_eq!(CapabilityStatus::from(false), CapabilityStatus::Unsupported);
        assert!(!CapabilityStatus::Unknown.is_supported());
    }

    #[test]
    fn test_staleness() {
        let peer = PeerId::parse("alice@example.com").unwrap();
        let mut entry = PeerCapability::discovering(peer, DiscoveryTicket::new(1));
        entry.resolve(CapabilityStatus::Supported);

        assert!(!entry.is_stale(None));
        assert!(!entry.is_stale(Some(Duration::seconds(60))));

        entry.last_updated = Utc::now() - Duration::seconds(120);
        assert!(entry.is_stale(Some(Duration::seconds(60))));
    }
}
