//! Signaling channel adapters

pub mod loopback;

pub use loopback::{ChannelCall, LoopbackChannel, ScriptedCapability};
