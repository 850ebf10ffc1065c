//! Application layer - the negotiation coordinator
//!
//! This layer orchestrates the domain objects behind a single task:
//! - Coordinator: owns the capability cache, admission control and watchdogs
//! - Handle: cloneable front door used by the UI layer and the signaling I/O
//! - Lifecycle: reaction to signaling connection events

pub mod coordinator;
pub mod handle;
pub mod lifecycle;
pub mod types;

pub use coordinator::CallCoordinator;
pub use handle::CoordinatorHandle;
pub use lifecycle::{ConnectionObserver, LifecycleAction};
pub use types::{CallAction, CapabilityUpdate, IncomingCallOutcome, OutgoingCallOutcome, SessionSnapshot};
