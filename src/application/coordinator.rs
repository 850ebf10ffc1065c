//! Call negotiation coordinator
//!
//! All mutable state (capability cache, sessions, media lock) lives in one
//! task. Discovery and session creation run in spawned tasks and report back
//! through the same mailbox, so every mutation is serialized and no lock is
//! ever held across an await.

use crate::application::handle::{Command, CoordinatorHandle};
use crate::application::lifecycle::{ConnectionObserver, LifecycleAction};
use crate::application::types::{
    CallAction, CapabilityUpdate, IncomingCallOutcome, OutgoingCallOutcome, SessionSnapshot,
};
use crate::config::CoordinatorConfig;
use crate::domain::capability::{
    CapabilityCache, CapabilityStatus, DiscoveryOutcome, DiscoveryTicket, LookupOutcome,
};
use crate::domain::session::{
    Admission, AdmissionControl, CallEvent, CallEventKind, Denial, Direction, Phase,
    ReleaseReason, SessionState,
};
use crate::domain::shared::error::{DomainError, Result};
use crate::domain::shared::value_objects::{ConversationId, PeerId, SessionHandle};
use crate::domain::signaling::{
    IncomingSessionRequest, MediaResource, PresenceUpdate, SignalingChannel, SignalingEvent,
};
use metrics::{counter, gauge};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outgoing call whose caller is still waiting for an outcome
struct PendingOutgoing {
    attempt: u64,
    reply: oneshot::Sender<Result<OutgoingCallOutcome>>,
}

pub struct CallCoordinator {
    config: CoordinatorConfig,
    channel: Arc<dyn SignalingChannel>,
    media: Arc<dyn MediaResource>,
    observer: ConnectionObserver,
    capabilities: CapabilityCache,
    admission: AdmissionControl,
    /// Conversations parked until their peer's discovery resolves
    awaiting_discovery: HashMap<PeerId, Vec<ConversationId>>,
    pending_outgoing: HashMap<ConversationId, PendingOutgoing>,
    next_attempt: u64,
    mailbox: mpsc::WeakSender<Command>,
    events: broadcast::Sender<CallEvent>,
    capability_updates: broadcast::Sender<CapabilityUpdate>,
}

impl CallCoordinator {
    /// Start the coordinator and its watchdog sweep on the current runtime
    pub fn spawn(
        config: CoordinatorConfig,
        channel: Arc<dyn SignalingChannel>,
        media: Arc<dyn MediaResource>,
    ) -> CoordinatorHandle {
        let (tx, rx) = mpsc::channel(config.command_buffer.max(1));
        let (events, _) = broadcast::channel(1000);
        let (capability_updates, _) = broadcast::channel(1000);

        let observer = ConnectionObserver::new(channel.clone(), config.call_feature.clone())
            .with_release_on_disconnect(config.release_on_disconnect);

        let coordinator = Self {
            capabilities: CapabilityCache::new().with_ttl(config.capability_ttl()),
            admission: AdmissionControl::new(config.exclusive_media),
            awaiting_discovery: HashMap::new(),
            pending_outgoing: HashMap::new(),
            next_attempt: 0,
            mailbox: tx.downgrade(),
            events: events.clone(),
            capability_updates: capability_updates.clone(),
            observer,
            channel,
            media,
            config,
        };

        tokio::spawn(sweep_watchdogs(
            tx.downgrade(),
            coordinator.config.watchdog_poll_interval(),
        ));
        coordinator.spawn_announce();
        tokio::spawn(coordinator.run(rx));

        CoordinatorHandle::new(tx, events, capability_updates)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<Command>) {
        info!("Call coordinator started");

        while let Some(command) = rx.recv().await {
            if let Command::Shutdown = command {
                break;
            }
            self.handle(command);
        }

        let released = self.admission.release_all(ReleaseReason::Disconnected);
        for session in &released {
            self.finish_session(session, ReleaseReason::Disconnected);
        }
        info!("Call coordinator stopped, released {} sessions", released.len());
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Lookup { peer, reply } => {
                let status = self.lookup(&peer);
                let _ = reply.send(status);
            }
            Command::Invalidate { peer } => self.invalidate(&peer),
            Command::CapabilityActions { peer, reply } => {
                let actions = self.capability_actions(&peer);
                let _ = reply.send(actions);
            }
            Command::RequestOutgoing {
                conversation,
                peer,
                reply,
            } => self.request_outgoing(conversation, peer, reply),
            Command::Incoming { request, reply } => self.incoming(request, reply),
            Command::Established {
                conversation,
                reply,
            } => {
                let _ = reply.send(self.establish(&conversation));
            }
            Command::EndCall {
                conversation,
                reply,
            } => {
                let ended = self.release(&conversation, ReleaseReason::Completed);
                let _ = reply.send(ended);
            }
            Command::Session {
                conversation,
                reply,
            } => {
                let snapshot = self.admission.get(&conversation).map(SessionSnapshot::from);
                let _ = reply.send(snapshot);
            }
            Command::MediaHolder { reply } => {
                let _ = reply.send(self.admission.media_holder().cloned());
            }
            Command::Signal(event) => self.signal(event),
            Command::DiscoveryCompleted {
                peer,
                ticket,
                result,
            } => self.discovery_completed(peer, ticket, result),
            Command::SessionCreated {
                conversation,
                attempt,
                result,
            } => self.session_created(conversation, attempt, result),
            Command::Tick => self.sweep(),
            Command::Shutdown => {}
        }
    }

    // Capability

    fn lookup(&mut self, peer: &PeerId) -> CapabilityStatus {
        let outcome = self.capabilities.lookup(peer);
        if let LookupOutcome::Discover(ticket) = outcome {
            self.spawn_discovery(peer.clone(), ticket);
        }
        outcome.status()
    }

    fn invalidate(&mut self, peer: &PeerId) {
        if self.capabilities.invalidate(peer) {
            debug!("Invalidated capability of {}", peer);
        }
    }

    fn capability_actions(&mut self, peer: &PeerId) -> Vec<CallAction> {
        if self.config.is_gateway(peer.domain()) {
            return Vec::new();
        }

        match self.lookup(peer) {
            CapabilityStatus::Supported => vec![CallAction::computer_to_computer(peer.clone())],
            CapabilityStatus::Unsupported | CapabilityStatus::Unknown => Vec::new(),
        }
    }

    fn spawn_discovery(&self, peer: PeerId, ticket: DiscoveryTicket) {
        counter!("callgate_discovery_requests_total").increment(1);
        debug!("Discovering call support of {} ({:?})", peer, ticket);

        let channel = self.channel.clone();
        let mailbox = self.mailbox.clone();
        let feature = self.config.call_feature.clone();
        let timeout = self.config.discovery_timeout();
        let attempts = self.config.discovery_attempts.max(1);

        tokio::spawn(async move {
            let result = discover(channel.as_ref(), &peer, &feature, timeout, attempts).await;
            deliver(
                &mailbox,
                Command::DiscoveryCompleted {
                    peer,
                    ticket,
                    result,
                },
            )
            .await;
        });
    }

    fn discovery_completed(&mut self, peer: PeerId, ticket: DiscoveryTicket, result: Result<bool>) {
        match self.capabilities.apply(&peer, ticket, result) {
            DiscoveryOutcome::Applied(status) => {
                info!("Call support of {}: {}", peer, status.as_str());
                let _ = self.capability_updates.send(CapabilityUpdate {
                    peer: peer.clone(),
                    status,
                });
                self.resume_waiting(&peer, status);
            }
            DiscoveryOutcome::Discarded => {
                debug!("Discarded stale discovery reply for {} ({:?})", peer, ticket);
                // Parked calls need a fresh answer for the invalidated peer
                if self.awaiting_discovery.contains_key(&peer) {
                    let status = self.lookup(&peer);
                    if status != CapabilityStatus::Unknown {
                        self.resume_waiting(&peer, status);
                    }
                }
            }
        }
    }

    fn resume_waiting(&mut self, peer: &PeerId, status: CapabilityStatus) {
        let Some(conversations) = self.awaiting_discovery.remove(peer) else {
            return;
        };

        for conversation in conversations {
            let discovering = self
                .admission
                .get(&conversation)
                .map(|session| session.phase() == Phase::Discovering)
                .unwrap_or(false);
            if !discovering || !self.pending_outgoing.contains_key(&conversation) {
                continue;
            }

            if status.is_supported() {
                self.begin_negotiation(&conversation, peer);
            } else {
                self.refuse_unsupported(&conversation, peer);
            }
        }
    }

    // Outgoing

    fn request_outgoing(
        &mut self,
        conversation: ConversationId,
        peer: PeerId,
        reply: oneshot::Sender<Result<OutgoingCallOutcome>>,
    ) {
        if self.config.is_gateway(peer.domain()) {
            debug!("Not calling gateway peer {}", peer);
            let _ = reply.send(Ok(OutgoingCallOutcome::Unsupported));
            return;
        }

        let phase = match self.admit(&conversation, &peer, Direction::Outgoing) {
            Ok(phase) => phase,
            Err(denial) => {
                let _ = reply.send(Ok(OutgoingCallOutcome::Denied { denial }));
                return;
            }
        };
        debug!("Outgoing call to {} admitted, {}", peer, phase.as_str());

        self.next_attempt += 1;
        self.pending_outgoing.insert(
            conversation.clone(),
            PendingOutgoing {
                attempt: self.next_attempt,
                reply,
            },
        );

        match self.capabilities.lookup(&peer) {
            LookupOutcome::Cached(CapabilityStatus::Supported) => {
                self.begin_negotiation(&conversation, &peer)
            }
            LookupOutcome::Cached(_) => self.refuse_unsupported(&conversation, &peer),
            LookupOutcome::InFlight => self.park(&peer, conversation),
            LookupOutcome::Discover(ticket) => {
                self.spawn_discovery(peer.clone(), ticket);
                self.park(&peer, conversation);
            }
        }
    }

    fn park(&mut self, peer: &PeerId, conversation: ConversationId) {
        let waiting = self.awaiting_discovery.entry(peer.clone()).or_default();
        if !waiting.contains(&conversation) {
            waiting.push(conversation);
        }
    }

    fn begin_negotiation(&mut self, conversation: &ConversationId, peer: &PeerId) {
        let threshold = self.config.watchdog_threshold_secs;
        let Some(session) = self.admission.get_mut(conversation) else {
            return;
        };
        if let Err(e) = session.transition_to(Phase::Negotiating) {
            error!("Cannot negotiate {}: {}", conversation, e);
            self.release(conversation, ReleaseReason::Failed(e.to_string()));
            return;
        }
        session.arm_watchdog(threshold);

        let Some(attempt) = self.pending_outgoing.get(conversation).map(|p| p.attempt) else {
            return;
        };

        let channel = self.channel.clone();
        let mailbox = self.mailbox.clone();
        let conversation = conversation.clone();
        let peer = peer.clone();

        tokio::spawn(async move {
            let result = channel.create_outgoing_session(&peer).await;
            deliver(
                &mailbox,
                Command::SessionCreated {
                    conversation,
                    attempt,
                    result,
                },
            )
            .await;
        });
    }

    fn refuse_unsupported(&mut self, conversation: &ConversationId, peer: &PeerId) {
        info!("{} does not support calls", peer);
        self.publish(
            conversation,
            CallEventKind::Unsupported { peer: peer.clone() },
        );
        // The waiting caller is answered with Unsupported on release
        self.release(conversation, ReleaseReason::Rejected);
    }

    fn session_created(
        &mut self,
        conversation: ConversationId,
        attempt: u64,
        result: Result<SessionHandle>,
    ) {
        let current = self
            .pending_outgoing
            .get(&conversation)
            .map(|pending| pending.attempt == attempt)
            .unwrap_or(false);
        if !current {
            // The session was released (timeout or hang-up) while the channel worked
            warn!(
                "Dropping late session creation result for {} (attempt {})",
                conversation, attempt
            );
            return;
        }
        let Some(pending) = self.pending_outgoing.remove(&conversation) else {
            return;
        };

        match result {
            Ok(handle) => {
                let peer = match self.admission.get_mut(&conversation) {
                    Some(session) => {
                        session.set_handle(handle);
                        session.peer_id().clone()
                    }
                    None => return,
                };
                info!("Placed call {} to {} in {}", handle, peer, conversation);
                self.publish(&conversation, CallEventKind::Placed { peer, handle });
                let _ = pending.reply.send(Ok(OutgoingCallOutcome::Placed { handle }));
            }
            Err(e) => {
                warn!("Failed to create session for {}: {}", conversation, e);
                self.publish(
                    &conversation,
                    CallEventKind::CreationFailed {
                        reason: e.to_string(),
                    },
                );
                self.release(&conversation, ReleaseReason::Failed(e.to_string()));
                let reason = match e {
                    DomainError::SessionCreationFailed(reason) => reason,
                    other => other.to_string(),
                };
                let _ = pending
                    .reply
                    .send(Err(DomainError::SessionCreationFailed(reason)));
            }
        }
    }

    // Incoming

    fn incoming(
        &mut self,
        request: IncomingSessionRequest,
        reply: Option<oneshot::Sender<IncomingCallOutcome>>,
    ) {
        let IncomingSessionRequest {
            request: handle,
            from,
            conversation_id,
        } = request;

        match self.admit(&conversation_id, &from, Direction::Incoming) {
            Ok(_) => {
                if let Some(session) = self.admission.get_mut(&conversation_id) {
                    session.set_request(handle);
                    session.arm_watchdog(self.config.watchdog_threshold_secs);
                }
                info!("Accepted incoming call from {} in {}", from, conversation_id);
                self.publish(
                    &conversation_id,
                    CallEventKind::Accepted {
                        peer: from,
                        request: handle,
                    },
                );
                if let Some(reply) = reply {
                    let _ = reply.send(IncomingCallOutcome::Accepted);
                }
            }
            Err(denial) => {
                info!("Rejecting incoming call from {} in {}", from, conversation_id);
                self.publish(
                    &conversation_id,
                    CallEventKind::IncomingRejected {
                        request: handle,
                        denial: denial.clone(),
                    },
                );

                let channel = self.channel.clone();
                tokio::spawn(async move {
                    if let Err(e) = channel.reject_incoming_session(handle).await {
                        warn!("Failed to reject incoming session {}: {}", handle, e);
                    }
                    if let Some(reply) = reply {
                        let _ = reply.send(IncomingCallOutcome::Rejected { denial });
                    }
                });
            }
        }
    }

    // Session lifecycle

    fn admit(
        &mut self,
        conversation: &ConversationId,
        peer: &PeerId,
        direction: Direction,
    ) -> std::result::Result<Phase, Denial> {
        match self.admission.try_acquire(conversation, peer, direction) {
            Admission::Permit(permit) => {
                if permit.holds_media {
                    self.media.acquired(conversation);
                }
                gauge!("callgate_active_sessions").set(self.admission.session_count() as f64);
                Ok(permit.phase)
            }
            Admission::Denied(denial) => {
                let reason = match &denial {
                    Denial::MediaBusy { .. } => "media_busy",
                    Denial::SessionExists { .. } => "session_exists",
                };
                counter!("callgate_admission_denied_total", "reason" => reason).increment(1);
                Err(denial)
            }
        }
    }

    fn establish(&mut self, conversation: &ConversationId) -> Result<()> {
        let session = self
            .admission
            .get_mut(conversation)
            .ok_or_else(|| DomainError::NotFound(conversation.to_string()))?;
        session.transition_to(Phase::Active)?;
        session.disarm_watchdog();

        info!("Call in {} is active", conversation);
        self.publish(conversation, CallEventKind::Established);
        Ok(())
    }

    /// Release a session; a no-op for unknown conversations
    fn release(&mut self, conversation: &ConversationId, reason: ReleaseReason) -> bool {
        let Some(session) = self.admission.release(conversation, reason.clone()) else {
            return false;
        };
        self.finish_session(&session, reason);
        true
    }

    fn finish_session(&mut self, session: &SessionState, reason: ReleaseReason) {
        let conversation = session.conversation_id();
        if self.config.exclusive_media {
            self.media.released(conversation);
        }
        gauge!("callgate_active_sessions").set(self.admission.session_count() as f64);

        if let Some(pending) = self.pending_outgoing.remove(conversation) {
            let outcome = match reason {
                ReleaseReason::TimedOut => Ok(OutgoingCallOutcome::TimedOut),
                ReleaseReason::Failed(e) => Err(DomainError::SessionCreationFailed(e)),
                // Only outgoing calls to peers without call support are released as Rejected
                ReleaseReason::Rejected => Ok(OutgoingCallOutcome::Unsupported),
                ReleaseReason::Completed | ReleaseReason::Disconnected => {
                    Ok(OutgoingCallOutcome::Cancelled)
                }
            };
            let _ = pending.reply.send(outcome);
        }

        debug!(
            "Released session {} in phase {}",
            conversation,
            session.phase().as_str()
        );
        self.publish(
            conversation,
            CallEventKind::Ended {
                phase: session.phase(),
            },
        );
    }

    fn sweep(&mut self) {
        let mut expired = Vec::new();
        for session in self.admission.sessions_mut() {
            if !session.phase().is_pending() {
                continue;
            }
            if let Some(reading) = session.poll_watchdog() {
                if reading.expired {
                    expired.push((session.conversation_id().clone(), reading.elapsed_secs));
                }
            }
        }

        for (conversation, elapsed_secs) in expired {
            warn!(
                "Negotiation in {} timed out after {}s",
                conversation, elapsed_secs
            );
            counter!("callgate_sessions_timed_out_total").increment(1);
            self.publish(&conversation, CallEventKind::TimedOut { elapsed_secs });
            self.release(&conversation, ReleaseReason::TimedOut);
        }
    }

    // Signaling notifications

    fn signal(&mut self, event: SignalingEvent) {
        match event {
            SignalingEvent::Presence(update) => self.presence(update),
            SignalingEvent::Connection(event) => match self.observer.plan(&event) {
                LifecycleAction::Announce => self.spawn_announce(),
                LifecycleAction::ReleaseSessions => {
                    let released = self.admission.release_all(ReleaseReason::Disconnected);
                    for session in &released {
                        self.finish_session(session, ReleaseReason::Disconnected);
                    }
                    info!("Released {} sessions after disconnect", released.len());
                }
                LifecycleAction::Nothing => {}
            },
            SignalingEvent::IncomingSession(request) => self.incoming(request, None),
        }
    }

    fn presence(&mut self, update: PresenceUpdate) {
        if update.available {
            return;
        }
        match PeerId::parse(&update.from) {
            Ok(peer) => self.invalidate(&peer),
            Err(_) => debug!("Ignoring presence from malformed address {:?}", update.from),
        }
    }

    fn spawn_announce(&self) {
        let observer = self.observer.clone();
        tokio::spawn(async move {
            let _ = observer.announce().await;
        });
    }

    fn publish(&self, conversation: &ConversationId, kind: CallEventKind) {
        // No receivers is fine
        let _ = self.events.send(CallEvent::new(conversation.clone(), kind));
    }
}

/// Query a peer with a per-attempt timeout
async fn discover(
    channel: &dyn SignalingChannel,
    peer: &PeerId,
    feature: &str,
    timeout: Duration,
    attempts: u32,
) -> Result<bool> {
    let mut last_error = DomainError::DiscoveryFailed(format!("no attempt made for {}", peer));

    for attempt in 1..=attempts {
        match tokio::time::timeout(timeout, channel.discover_capability(peer, feature)).await {
            Ok(Ok(supported)) => return Ok(supported),
            Ok(Err(e)) => last_error = e,
            Err(_) => {
                last_error =
                    DomainError::DiscoveryFailed(format!("no reply from {} within {:?}", peer, timeout))
            }
        }
        debug!(
            "Discovery attempt {}/{} for {} failed: {}",
            attempt, attempts, peer, last_error
        );
    }

    Err(last_error)
}

async fn deliver(mailbox: &mpsc::WeakSender<Command>, command: Command) {
    if let Some(tx) = mailbox.upgrade() {
        let _ = tx.send(command).await;
    }
}

async fn sweep_watchdogs(mailbox: mpsc::WeakSender<Command>, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let Some(tx) = mailbox.upgrade() else {
            break;
        };
        if tx.send(Command::Tick).await.is_err() {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::shared::value_objects::RequestHandle;
    use crate::domain::signaling::{DetachedMedia, MockSignalingChannel};

    fn spawn(channel: MockSignalingChannel) -> CoordinatorHandle {
        spawn_with(channel, CoordinatorConfig::default())
    }

    fn spawn_with(mut channel: MockSignalingChannel, config: CoordinatorConfig) -> CoordinatorHandle {
        channel.expect_announce_feature().returning(|_| Ok(()));
        CallCoordinator::spawn(config, Arc::new(channel), Arc::new(DetachedMedia))
    }

    fn peer(address: &str) -> PeerId {
        PeerId::parse(address).unwrap()
    }

    #[tokio::test]
    async fn test_outgoing_call_after_discovery() {
        let mut channel = MockSignalingChannel::new();
        channel
            .expect_discover_capability()
            .times(1)
            .returning(|_, _| Ok(true));
        channel
            .expect_create_outgoing_session()
            .times(1)
            .returning(|_| Ok(SessionHandle::new()));

        let handle = spawn(channel);
        let alice = peer("alice@example.com");
        let room = ConversationId::from(&alice);

        let outcome = handle
            .request_outgoing_call(room.clone(), alice.clone())
            .await
            .unwrap();
        assert!(matches!(outcome, OutgoingCallOutcome::Placed { .. }));

        let session = handle.session_state(room.clone()).await.unwrap().unwrap();
        assert_eq!(session.phase, Phase::Negotiating);
        assert_eq!(handle.media_holder().await.unwrap(), Some(room));
        assert_eq!(handle.lookup(alice).await.unwrap(), CapabilityStatus::Supported);
    }

    #[tokio::test]
    async fn test_session_creation_failure_releases() {
        let mut channel = MockSignalingChannel::new();
        channel.expect_discover_capability().returning(|_, _| Ok(true));
        channel
            .expect_create_outgoing_session()
            .returning(|_| Err(DomainError::SessionCreationFailed("service-unavailable".into())));

        let handle = spawn(channel);
        let alice = peer("alice@example.com");
        let room = ConversationId::from(&alice);

        let result = handle.request_outgoing_call(room.clone(), alice).await;
        assert_eq!(
            result,
            Err(DomainError::SessionCreationFailed("service-unavailable".into()))
        );
        assert!(handle.session_state(room).await.unwrap().is_none());
        assert!(handle.media_holder().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unsupported_peer_is_not_called() {
        let mut channel = MockSignalingChannel::new();
        channel.expect_discover_capability().returning(|_, _| Ok(false));
        channel.expect_create_outgoing_session().never();

        let handle = spawn(channel);
        let bob = peer("bob@example.com");
        let room = ConversationId::from(&bob);

        let outcome = handle.request_outgoing_call(room.clone(), bob).await.unwrap();
        assert_eq!(outcome, OutgoingCallOutcome::Unsupported);
        assert!(handle.media_holder().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_gateway_peer_gets_no_actions() {
        let mut channel = MockSignalingChannel::new();
        channel.expect_discover_capability().never();

        let config = CoordinatorConfig {
            gateway_domains: vec!["aim.example.com".to_string()],
            ..CoordinatorConfig::default()
        };
        let handle = spawn_with(channel, config);

        let actions = handle
            .get_capability_actions(peer("buddy@aim.example.com"))
            .await
            .unwrap();
        assert!(actions.is_empty());
    }

    #[tokio::test]
    async fn test_incoming_denied_is_rejected() {
        let mut channel = MockSignalingChannel::new();
        channel
            .expect_reject_incoming_session()
            .times(1)
            .returning(|_| Ok(()));

        let handle = spawn(channel);
        let carol = peer("carol@example.com");
        let room = ConversationId::from(&carol);

        let first = IncomingSessionRequest {
            request: RequestHandle::new(),
            from: carol.clone(),
            conversation_id: room.clone(),
        };
        let second = IncomingSessionRequest {
            request: RequestHandle::new(),
            ..first.clone()
        };

        assert_eq!(
            handle.on_incoming_call(first).await.unwrap(),
            IncomingCallOutcome::Accepted
        );
        assert!(matches!(
            handle.on_incoming_call(second).await.unwrap(),
            IncomingCallOutcome::Rejected {
                denial: Denial::SessionExists { .. }
            }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pending_negotiation_times_out() {
        let handle = spawn(MockSignalingChannel::new());
        let mut events = handle.events();
        let dave = peer("dave@example.com");
        let room = ConversationId::from(&dave);

        let request = IncomingSessionRequest {
            request: RequestHandle::new(),
            from: dave,
            conversation_id: room.clone(),
        };
        handle.on_incoming_call(request).await.unwrap();

        tokio::time::sleep(Duration::from_secs(6)).await;

        assert!(handle.session_state(room.clone()).await.unwrap().is_none());
        assert!(handle.media_holder().await.unwrap().is_none());

        let mut timed_out = false;
        while let Ok(event) = events.try_recv() {
            if matches!(event.kind, CallEventKind::TimedOut { .. }) {
                timed_out = true;
            }
        }
        assert!(timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_established_session_does_not_time_out() {
        let handle = spawn(MockSignalingChannel::new());
        let erin = peer("erin@example.com");
        let room = ConversationId::from(&erin);

        let request = IncomingSessionRequest {
            request: RequestHandle::new(),
            from: erin,
            conversation_id: room.clone(),
        };
        handle.on_incoming_call(request).await.unwrap();
        handle.session_established(room.clone()).await.unwrap();

        tokio::time::sleep(Duration::from_secs(30)).await;

        let session = handle.session_state(room.clone()).await.unwrap().unwrap();
        assert_eq!(session.phase, Phase::Active);
        assert!(handle.end_call(room.clone()).await.unwrap());
        assert!(!handle.end_call(room).await.unwrap());
    }
}
