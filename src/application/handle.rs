//! Cloneable front door to the coordinator task

use crate::application::types::{
    CallAction, CapabilityUpdate, IncomingCallOutcome, OutgoingCallOutcome, SessionSnapshot,
};
use crate::domain::capability::{CapabilityStatus, DiscoveryTicket};
use crate::domain::session::CallEvent;
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{ConversationId, PeerId, SessionHandle};
use crate::domain::signaling::{IncomingSessionRequest, SignalingEvent};
use tokio::sync::{broadcast, mpsc, oneshot};

/// Messages processed, one at a time, by the coordinator task
pub(crate) enum Command {
    Lookup {
        peer: PeerId,
        reply: oneshot::Sender<CapabilityStatus>,
    },
    Invalidate {
        peer: PeerId,
    },
    CapabilityActions {
        peer: PeerId,
        reply: oneshot::Sender<Vec<CallAction>>,
    },
    RequestOutgoing {
        conversation: ConversationId,
        peer: PeerId,
        reply: oneshot::Sender<Result<OutgoingCallOutcome>>,
    },
    Incoming {
        request: IncomingSessionRequest,
        reply: Option<oneshot::Sender<IncomingCallOutcome>>,
    },
    Established {
        conversation: ConversationId,
        reply: oneshot::Sender<Result<()>>,
    },
    EndCall {
        conversation: ConversationId,
        reply: oneshot::Sender<bool>,
    },
    Session {
        conversation: ConversationId,
        reply: oneshot::Sender<Option<SessionSnapshot>>,
    },
    MediaHolder {
        reply: oneshot::Sender<Option<ConversationId>>,
    },
    Signal(SignalingEvent),
    DiscoveryCompleted {
        peer: PeerId,
        ticket: DiscoveryTicket,
        result: Result<bool>,
    },
    SessionCreated {
        conversation: ConversationId,
        attempt: u64,
        result: Result<SessionHandle>,
    },
    Tick,
    Shutdown,
}

#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<Command>,
    events: broadcast::Sender<CallEvent>,
    capabilities: broadcast::Sender<CapabilityUpdate>,
}

impl CoordinatorHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Command>,
        events: broadcast::Sender<CallEvent>,
        capabilities: broadcast::Sender<CapabilityUpdate>,
    ) -> Self {
        Self {
            tx,
            events,
            capabilities,
        }
    }

    /// Place a call to `peer` within `conversation`
    ///
    /// Resolves once the session is created or the attempt is refused. A
    /// capability miss waits for discovery without blocking the coordinator.
    pub async fn request_outgoing_call(
        &self,
        conversation: ConversationId,
        peer: PeerId,
    ) -> Result<OutgoingCallOutcome> {
        self.call(|reply| Command::RequestOutgoing {
            conversation,
            peer,
            reply,
        })
        .await?
    }

    /// Route an inbound request through admission control
    pub async fn on_incoming_call(
        &self,
        request: IncomingSessionRequest,
    ) -> Result<IncomingCallOutcome> {
        self.call(|reply| Command::Incoming {
            request,
            reply: Some(reply),
        })
        .await
    }

    /// Call actions for a peer; empty while support is unknown or absent
    pub async fn get_capability_actions(&self, peer: PeerId) -> Result<Vec<CallAction>> {
        self.call(|reply| Command::CapabilityActions { peer, reply }).await
    }

    /// Cached status, starting a discovery on a miss
    pub async fn lookup(&self, peer: PeerId) -> Result<CapabilityStatus> {
        self.call(|reply| Command::Lookup { peer, reply }).await
    }

    pub async fn invalidate(&self, peer: PeerId) -> Result<()> {
        self.send(Command::Invalidate { peer }).await
    }

    /// Mark a negotiating session as confirmed
    pub async fn session_established(&self, conversation: ConversationId) -> Result<()> {
        self.call(|reply| Command::Established {
            conversation,
            reply,
        })
        .await?
    }

    /// End a call; returns whether a session existed
    pub async fn end_call(&self, conversation: ConversationId) -> Result<bool> {
        self.call(|reply| Command::EndCall {
            conversation,
            reply,
        })
        .await
    }

    pub async fn session_state(
        &self,
        conversation: ConversationId,
    ) -> Result<Option<SessionSnapshot>> {
        self.call(|reply| Command::Session {
            conversation,
            reply,
        })
        .await
    }

    /// Conversation currently holding the media lock
    pub async fn media_holder(&self) -> Result<Option<ConversationId>> {
        self.call(|reply| Command::MediaHolder { reply }).await
    }

    /// Hand a notification from the signaling I/O layer to the coordinator
    pub async fn notify(&self, event: SignalingEvent) -> Result<()> {
        self.send(Command::Signal(event)).await
    }

    pub fn events(&self) -> broadcast::Receiver<CallEvent> {
        self.events.subscribe()
    }

    pub fn capability_updates(&self) -> broadcast::Receiver<CapabilityUpdate> {
        self.capabilities.subscribe()
    }

    pub async fn shutdown(&self) -> Result<()> {
        self.send(Command::Shutdown).await
    }

    async fn send(&self, command: Command) -> Result<()> {
        self.tx
            .send(command)
            .await
            .map_err(|_| DomainError::CoordinatorUnavailable)
    }

    async fn call<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.send(make(reply)).await?;
        rx.await.map_err(|_| DomainError::CoordinatorUnavailable)
    }
}
