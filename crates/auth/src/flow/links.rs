//! Incoming app-link event bus.
//!
//! Platform glue publishes every incoming deep link here; each redirect flow
//! attempt subscribes before navigating and filters for its own redirect
//! URI. A broadcast channel keeps attempts independent: subscribers only
//! observe links published after they subscribed.

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 16;

/// Fan-out bus for incoming app-link URLs.
#[derive(Debug, Clone)]
pub struct AppLinkBus {
    tx: broadcast::Sender<String>,
}

impl AppLinkBus {
    /// Create a bus with a small bounded backlog.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Publish an incoming app link. Returns how many listeners saw it;
    /// links arriving with no active flow are dropped.
    pub fn publish(&self, url: impl Into<String>) -> usize {
        self.tx.send(url.into()).unwrap_or(0)
    }

    /// Subscribe to links published from this point on.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl Default for AppLinkBus {
    fn default() -> Self {
        Self::new()
    }
}
