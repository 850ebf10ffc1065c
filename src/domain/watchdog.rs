//! Negotiation watchdog
//!
//! A restartable elapsed-time counter. It only reports; the coordinator
//! decides what an expired negotiation means for its session.

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// Default negotiation bound in seconds
pub const DEFAULT_THRESHOLD_SECS: u64 = 5;

/// Snapshot returned by [`NegotiationWatchdog::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogReading {
    pub elapsed_secs: u64,
    pub expired: bool,
}

#[derive(Debug, Clone)]
pub struct NegotiationWatchdog {
    threshold_secs: u64,
    start_mark: Instant,
    expired: bool,
}

impl NegotiationWatchdog {
    /// Create a watchdog that is already running
    pub fn new(threshold_secs: u64) -> Self {
        Self {
            threshold_secs,
            start_mark: Instant::now(),
            expired: false,
        }
    }

    /// Restart the timer and clear the expired latch
    pub fn start(&mut self) -> Instant {
        self.start_mark = Instant::now();
        self.expired = false;
        self.start_mark
    }

    /// Measure elapsed whole seconds since `start_mark`
    ///
    /// `expired` latches: once set it stays set until [`start`](Self::start).
    pub fn poll(&mut self, start_mark: Instant) -> WatchdogReading {
        let elapsed_secs = Instant::now().saturating_duration_since(start_mark).as_secs();
        if elapsed_secs >= self.threshold_secs {
            self.expired = true;
        }

        WatchdogReading {
            elapsed_secs,
            expired: self.expired,
        }
    }

    /// Poll against this timer's own start mark
    pub fn check(&mut self) -> WatchdogReading {
        self.poll(self.start_mark)
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }
}

impl Default for NegotiationWatchdog {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD_SECS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_not_expired_below_threshold() {
        let mut watchdog = NegotiationWatchdog::default();
        let mark = watchdog.start();

        for _ in 0..4 {
            tokio::time::advance(Duration::from_secs(1)).await;
            assert!(!watchdog.poll(mark).expired);
        }

        tokio::time::advance(Duration::from_millis(999)).await;
        let reading = watchdog.poll(mark);
        assert_eq!(reading.elapsed_secs, 4);
        assert!(!reading.expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expires_at_threshold_and_latches() {
        let mut watchdog = NegotiationWatchdog::default();
        let mark = watchdog.start();

        tokio::time::advance(Duration::from_secs(5)).await;
        let reading = watchdog.poll(mark);
        assert_eq!(reading.elapsed_secs, 5);
        assert!(reading.expired);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert!(watchdog.check().expired);

        // A fresh mark does not clear the latch
        let reading = watchdog.poll(Instant::now());
        assert_eq!(reading.elapsed_secs, 0);
        assert!(reading.expired);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_clears_latch() {
        let mut watchdog = NegotiationWatchdog::new(2);
        watchdog.start();

        tokio::time::advance(Duration::from_secs(3)).await;
        assert!(watchdog.check().expired);

        watchdog.start();
        assert!(!watchdog.is_expired());
        assert!(!watchdog.check().expired);
    }
}
