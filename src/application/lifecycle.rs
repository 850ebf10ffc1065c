//! Connection lifecycle observer
//!
//! Re-announces the local call feature whenever the signaling connection is
//! (re)established. Authentication and close events leave state alone unless
//! the deployment opts into releasing sessions on disconnect.

use crate::domain::shared::error::Result;
use crate::domain::signaling::{ConnectionEvent, SignalingChannel};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What the coordinator should do for a connection event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleAction {
    Announce,
    ReleaseSessions,
    Nothing,
}

#[derive(Clone)]
pub struct ConnectionObserver {
    channel: Arc<dyn SignalingChannel>,
    feature: String,
    release_on_disconnect: bool,
}

impl ConnectionObserver {
    pub fn new(channel: Arc<dyn SignalingChannel>, feature: String) -> Self {
        Self {
            channel,
            feature,
            release_on_disconnect: false,
        }
    }

    pub fn with_release_on_disconnect(mut self, enabled: bool) -> Self {
        self.release_on_disconnect = enabled;
        self
    }

    pub fn feature(&self) -> &str {
        &self.feature
    }

    pub fn plan(&self, event: &ConnectionEvent) -> LifecycleAction {
        match event {
            ConnectionEvent::Connected => LifecycleAction::Announce,
            ConnectionEvent::Authenticated => {
                debug!("Signaling connection authenticated");
                LifecycleAction::Nothing
            }
            ConnectionEvent::Closed | ConnectionEvent::ClosedOnError(_) => {
                if let ConnectionEvent::ClosedOnError(reason) = event {
                    warn!("Signaling connection closed on error: {}", reason);
                } else {
                    info!("Signaling connection closed");
                }

                if self.release_on_disconnect {
                    LifecycleAction::ReleaseSessions
                } else {
                    LifecycleAction::Nothing
                }
            }
        }
    }

    /// Advertise the call feature; safe to repeat
    pub async fn announce(&self) -> Result<()> {
        match self.channel.announce_feature(&self.feature).await {
            Ok(()) => {
                info!("Announced call feature {}", self.feature);
                Ok(())
            }
            Err(e) => {
                warn!("Failed to announce call feature {}: {}", self.feature, e);
                Err(e)
            }
        }
    }
}
