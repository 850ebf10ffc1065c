//! Media resource adapters

use crate::domain::shared::value_objects::ConversationId;
use crate::domain::signaling::MediaResource;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::info;

/// Media adapter that logs and counts lock transitions
#[derive(Debug, Default)]
pub struct TrackedMedia {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
}

impl TrackedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// Whether the device is currently taken
    pub fn in_use(&self) -> bool {
        self.acquisitions() > self.releases()
    }
}

impl MediaResource for TrackedMedia {
    fn acquired(&self, conversation: &ConversationId) {
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        info!("Media device acquired by {}", conversation);
    }

    fn released(&self, conversation: &ConversationId) {
        self.releases.fetch_add(1, Ordering::SeqCst);
        info!("Media device released by {}", conversation);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracks_usage() {
        let media = TrackedMedia::new();
        let room = ConversationId::new("room");

        media.acquired(&room);
        assert!(media.in_use());

        media.released(&room);
        assert!(!media.in_use());
        assert_eq!(media.acquisitions(), 1);
        assert_eq!(media.releases(), 1);
    }
}
