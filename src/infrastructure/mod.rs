//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Signaling channel adapters
//! - Media resource adapters

pub mod media;
pub mod signaling;
