//! Domain errors

use thiserror::Error;

/// Domain result type
pub type Result<T> = std::result::Result<T, DomainError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid peer identifier: {0}")]
    InvalidPeerId(String),

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Capability discovery failed: {0}")]
    DiscoveryFailed(String),

    #[error("Session creation failed: {0}")]
    SessionCreationFailed(String),

    #[error("Coordinator is not running")]
    CoordinatorUnavailable,

    #[error("Internal error: {0}")]
    Internal(String),
}
