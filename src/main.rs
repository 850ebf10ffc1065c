use callgate::application::{CallCoordinator, CoordinatorHandle};
use callgate::config::Config;
use callgate::domain::session::CallEvent;
use callgate::domain::shared::value_objects::{ConversationId, PeerId, RequestHandle};
use callgate::domain::signaling::{
    ConnectionEvent, IncomingSessionRequest, PresenceUpdate, SignalingEvent,
};
use callgate::infrastructure::media::TrackedMedia;
use callgate::infrastructure::signaling::{LoopbackChannel, ScriptedCapability};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log.level)),
        )
        .init();

    info!("Starting call coordinator");
    info!("Configuration loaded: {:?}", config);

    let channel = Arc::new(LoopbackChannel::new());
    let media = Arc::new(TrackedMedia::new());
    let coordinator = CallCoordinator::spawn(config.coordinator.clone(), channel.clone(), media.clone());

    let events = coordinator.events();
    let printer = tokio::spawn(print_events(events));

    demo_negotiation(&coordinator, &channel).await?;

    coordinator.shutdown().await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    printer.abort();

    info!(
        "Media device acquired {} times, released {} times",
        media.acquisitions(),
        media.releases()
    );
    Ok(())
}

/// Walk through a call against the loopback channel
async fn demo_negotiation(
    coordinator: &CoordinatorHandle,
    channel: &LoopbackChannel,
) -> anyhow::Result<()> {
    info!("=== Call Negotiation Demo ===");

    let alice = PeerId::parse("alice@example.com/desktop")?;
    let bob = PeerId::parse("bob@example.com")?;
    channel.set_capability(&alice, ScriptedCapability::Supported).await;
    channel.set_capability(&bob, ScriptedCapability::Unsupported).await;

    coordinator
        .notify(SignalingEvent::Connection(ConnectionEvent::Connected))
        .await?;

    // Outgoing call waits for discovery, then creates the session
    let room = ConversationId::from(&alice);
    let outcome = coordinator
        .request_outgoing_call(room.clone(), alice.clone())
        .await?;
    info!("Outgoing call to {}: {:?}", alice, outcome);

    let actions = coordinator.get_capability_actions(alice.clone()).await?;
    info!("Actions for {}: {:?}", alice, actions);

    // A second caller in the same conversation is turned away
    let request = IncomingSessionRequest {
        request: RequestHandle::new(),
        from: alice.clone(),
        conversation_id: room.clone(),
    };
    let incoming = coordinator.on_incoming_call(request).await?;
    info!("Incoming call while busy: {:?}", incoming);

    coordinator.session_established(room.clone()).await?;
    coordinator.end_call(room).await?;

    // Unsupported peers get no call
    let outcome = coordinator
        .request_outgoing_call(ConversationId::from(&bob), bob.clone())
        .await?;
    info!("Outgoing call to {}: {:?}", bob, outcome);

    coordinator
        .notify(SignalingEvent::Presence(PresenceUpdate {
            from: "alice@example.com/desktop".to_string(),
            available: false,
        }))
        .await?;
    info!("Alice went offline, capability now {:?}", coordinator.lookup(alice).await?);

    info!("=== Call Negotiation Demo Complete ===");
    Ok(())
}

async fn print_events(mut events: broadcast::Receiver<CallEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(json) => info!("Call event: {}", json),
                Err(e) => warn!("Failed to serialize event: {}", e),
            },
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!("Event printer lagged, skipped {} events", skipped)
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}
