//! Session bounded context - admission of call sessions and their lifecycle

pub mod admission;
pub mod entity;
pub mod event;
pub mod value_object;

pub use admission::{Admission, AdmissionControl, Denial, MediaResourceLock, Permit};
pub use entity::SessionState;
pub use event::{CallEvent, CallEventKind};
pub use value_object::{Direction, Phase, ReleaseReason};
