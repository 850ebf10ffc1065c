//! Per-peer capability cache
//!
//! The cache is plain state with no interior locking: it is owned by the
//! coordinator task, which serializes every lookup, invalidation and
//! discovery reply.

use super::entity::{CapabilityStatus, DiscoveryTicket, PeerCapability};
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::PeerId;
use chrono::Duration;
use std::collections::HashMap;
use tracing::debug;

/// Result of a cache lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    /// A resolved, non-stale status is cached
    Cached(CapabilityStatus),
    /// A discovery for this peer is already outstanding
    InFlight,
    /// The caller must issue a discovery under this ticket
    Discover(DiscoveryTicket),
}

impl LookupOutcome {
    /// Status as seen by a caller that does not wait for discovery
    pub fn status(&self) -> CapabilityStatus {
        match self {
            LookupOutcome::Cached(status) => *status,
            LookupOutcome::InFlight | LookupOutcome::Discover(_) => CapabilityStatus::Unknown,
        }
    }
}

/// Result of applying a discovery reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryOutcome {
    Applied(CapabilityStatus),
    /// The peer was invalidated or re-queried since the ticket was issued
    Discarded,
}

pub struct CapabilityCache {
    entries: HashMap<PeerId, PeerCapability>,
    next_sequence: u64,
    ttl: Option<Duration>,
}

impl CapabilityCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            next_sequence: 0,
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Look up a peer, starting a discovery on a miss or a stale entry
    pub fn lookup(&mut self, peer: &PeerId) -> LookupOutcome {
        if let Some(entry) = self.entries.get(peer) {
            if entry.is_discovering() {
                return LookupOutcome::InFlight;
            }
            if !entry.is_stale(self.ttl) {
                return LookupOutcome::Cached(entry.status);
            }
            debug!("Capability entry for {} is stale", peer);
        }

        let ticket = self.issue_ticket();
        self.entries
            .insert(peer.clone(), PeerCapability::discovering(peer.clone(), ticket));
        LookupOutcome::Discover(ticket)
    }

    /// Apply a discovery reply
    ///
    /// A failed discovery is cached as `Unsupported`. Replies whose ticket no
    /// longer matches the entry are dropped without touching the cache.
    pub fn apply(
        &mut self,
        peer: &PeerId,
        ticket: DiscoveryTicket,
        result: Result<bool, DomainError>,
    ) -> DiscoveryOutcome {
        let Some(entry) = self.entries.get_mut(peer) else {
            return DiscoveryOutcome::Discarded;
        };
        if entry.in_flight != Some(ticket) {
            return DiscoveryOutcome::Discarded;
        }

        let status = match result {
            Ok(supported) => CapabilityStatus::from(supported),
            Err(e) => {
                debug!("Negative caching {} after discovery failure: {}", peer, e);
                CapabilityStatus::Unsupported
            }
        };
        entry.resolve(status);
        DiscoveryOutcome::Applied(status)
    }

    /// Forget a peer; returns whether an entry existed
    pub fn invalidate(&mut self, peer: &PeerId) -> bool {
        self.entries.remove(peer).is_some()
    }

    /// Current status without triggering discovery
    pub fn peek(&self, peer: &PeerId) -> CapabilityStatus {
        self.entries
            .get(peer)
            .filter(|entry| !entry.is_discovering())
            .map(|entry| entry.status)
            .unwrap_or(CapabilityStatus::Unknown)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn issue_ticket(&mut self) -> DiscoveryTicket {
        self.next_sequence += 1;
        DiscoveryTicket::new(self.next_sequence)
    }
}

impl Default for CapabilityCache {
    fn default() -> Self {
        Self::new()
    }
}
