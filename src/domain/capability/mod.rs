//! Capability bounded context - whether a remote peer can negotiate calls

pub mod cache;
pub mod entity;

pub use cache::{CapabilityCache, DiscoveryOutcome, LookupOutcome};
pub use entity::{CapabilityStatus, DiscoveryTicket, PeerCapability};
