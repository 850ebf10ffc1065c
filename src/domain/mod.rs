//! Domain layer - negotiation rules with no I/O
//!
//! This layer contains:
//! - Capability: per-peer call support, discovered lazily
//! - Session: admission control and the session lifecycle
//! - Watchdog: bound on pending negotiations
//! - Signaling: ports for the external collaborators

pub mod capability;
pub mod session;
pub mod shared;
pub mod signaling;
pub mod watchdog;

// Re-export commonly used types
pub use shared::{DomainError, Result};
