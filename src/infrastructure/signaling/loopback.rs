//! In-memory signaling channel
//!
//! Answers capability queries from a script and records every request it
//! receives. Used by the demo binary and by integration tests in place of a
//! real presence-and-messaging connection.

use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{PeerId, RequestHandle, SessionHandle};
use crate::domain::signaling::SignalingChannel;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::{watch, RwLock};
use tracing::debug;

/// Scripted reply to a capability query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptedCapability {
    Supported,
    Unsupported,
    /// The query errors out
    Fails,
    /// The query never gets a reply
    Silent,
}

/// Request received by the channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelCall {
    Discover(PeerId),
    CreateSession(PeerId),
    Reject(RequestHandle),
    Announce(String),
}

pub struct LoopbackChannel {
    script: RwLock<HashMap<PeerId, ScriptedCapability>>,
    failing_sessions: RwLock<HashSet<PeerId>>,
    calls: RwLock<Vec<ChannelCall>>,
    /// Discovery replies are held while the gate is closed
    gate: watch::Sender<bool>,
}

impl LoopbackChannel {
    pub fn new() -> Self {
        let (gate, _) = watch::channel(true);
        Self {
            script: RwLock::new(HashMap::new()),
            failing_sessions: RwLock::new(HashSet::new()),
            calls: RwLock::new(Vec::new()),
            gate,
        }
    }

    /// Script the capability reply for a peer; unscripted peers fail
    pub async fn set_capability(&self, peer: &PeerId, capability: ScriptedCapability) {
        self.script.write().await.insert(peer.clone(), capability);
    }

    /// Make session creation towards `peer` fail
    pub async fn fail_sessions_to(&self, peer: &PeerId) {
        self.failing_sessions.write().await.insert(peer.clone());
    }

    /// Hold discovery replies until [`open_gate`](Self::open_gate)
    pub fn close_gate(&self) {
        self.gate.send_replace(false);
    }

    pub fn open_gate(&self) {
        self.gate.send_replace(true);
    }

    pub async fn discoveries_of(&self, peer: &PeerId) -> usize {
        self.count(|call| matches!(call, ChannelCall::Discover(p) if p == peer))
            .await
    }

    pub async fn sessions_created(&self) -> usize {
        self.count(|call| matches!(call, ChannelCall::CreateSession(_)))
            .await
    }

    pub async fn rejections(&self) -> Vec<RequestHandle> {
        self.calls
            .read()
            .await
            .iter()
            .filter_map(|call| match call {
                ChannelCall::Reject(request) => Some(*request),
                _ => None,
            })
            .collect()
    }

    pub async fn announcements(&self) -> usize {
        self.count(|call| matches!(call, ChannelCall::Announce(_)))
            .await
    }

    async fn count(&self, predicate: impl Fn(&ChannelCall) -> bool) -> usize {
        self.calls.read().await.iter().filter(|call| predicate(call)).count()
    }

    async fn record(&self, call: ChannelCall) {
        debug!("Loopback channel received {:?}", call);
        self.calls.write().await.push(call);
    }
}

impl Default for LoopbackChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SignalingChannel for LoopbackChannel {
    async fn discover_capability(&self, peer: &PeerId, _feature: &str) -> Result<bool> {
        self.record(ChannelCall::Discover(peer.clone())).await;

        let mut gate = self.gate.subscribe();
        gate.wait_for(|open| *open)
            .await
            .map_err(|_| DomainError::Internal("loopback gate dropped".to_string()))?;

        let scripted = self.script.read().await.get(peer).copied();
        match scripted {
            Some(ScriptedCapability::Supported) => Ok(true),
            Some(ScriptedCapability::Unsupported) => Ok(false),
            Some(ScriptedCapability::Silent) => std::future::pending().await,
            Some(ScriptedCapability::Fails) | None => Err(DomainError::DiscoveryFailed(format!(
                "{} did not answer the query",
                peer
            ))),
        }
    }

    async fn create_outgoing_session(&self, peer: &PeerId) -> Result<SessionHandle> {
        self.record(ChannelCall::CreateSession(peer.clone())).await;

        if self.failing_sessions.read().await.contains(peer) {
            return Err(DomainError::SessionCreationFailed(format!(
                "{} refused the session",
                peer
            )));
        }
        Ok(SessionHandle::new())
    }

    async fn reject_incoming_session(&self, request: RequestHandle) -> Result<()> {
        self.record(ChannelCall::Reject(request)).await;
        Ok(())
    }

    async fn announce_feature(&self, feature: &str) -> Result<()> {
        self.record(ChannelCall::Announce(feature.to_string())).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(address: &str) -> PeerId {
        PeerId::parse(address).unwrap()
    }

    #[tokio::test]
    async fn test_scripted_capabilities() {
        let channel = LoopbackChannel::new();
        let alice = peer("alice@example.com");
        let bob = peer("bob@example.com");
        channel.set_capability(&alice, ScriptedCapability::Supported).await;
        channel.set_capability(&bob, ScriptedCapability::Unsupported).await;

        assert_eq!(channel.discover_capability(&alice, "f").await, Ok(true));
        assert_eq!(channel.discover_capability(&bob, "f").await, Ok(false));
        assert!(channel
            .discover_capability(&peer("carol@example.com"), "f")
            .await
            .is_err());
        assert_eq!(channel.discoveries_of(&alice).await, 1);
    }

    #[tokio::test]
    async fn test_gate_holds_replies() {
        let channel = std::sync::Arc::new(LoopbackChannel::new());
        let alice = peer("alice@example.com");
        channel.set_capability(&alice, ScriptedCapability::Supported).await;
        channel.close_gate();

        let pending = {
            let channel = channel.clone();
            let alice = alice.clone();
            tokio::spawn(async move { channel.discover_capability(&alice, "f").await })
        };

        tokio::task::yield_now().await;
        assert!(!pending.is_finished());

        channel.open_gate();
        assert_eq!(pending.await.unwrap(), Ok(true));
    }

    #[tokio::test]
    async fn test_records_requests() {
        let channel = LoopbackChannel::new();
        let alice = peer("alice@example.com");
        channel.fail_sessions_to(&alice).await;

        assert!(channel.create_outgoing_session(&alice).await.is_err());
        channel.announce_feature("urn:call").await.unwrap();
        let request = RequestHandle::new();
        channel.reject_incoming_session(request).await.unwrap();

        assert_eq!(channel.sessions_created().await, 1);
        assert_eq!(channel.announcements().await, 1);
        assert_eq!(channel.rejections().await, vec![request]);
    }
}
