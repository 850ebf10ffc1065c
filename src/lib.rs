//! Callgate - call negotiation coordinator for presence-and-messaging services
//!
//! Decides whether a peer can receive a call, admits at most one live call per
//! conversation (and per local media device), and bounds how long a
//! negotiation may stay pending.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export commonly used types
pub use application::{CallCoordinator, CoordinatorHandle};
pub use domain::shared::error::DomainError;
pub use domain::shared::error::Result;
