//! External browser/app launching seam.
//!
//! The redirect flow hands control to the platform to open the provider's
//! authorization page; the platform hands control back via an app link. This
//! module owns the outbound half.

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

/// Failure to hand a URL to the platform.
///
/// The message is inspected by the redirect flow: launch failures that read
/// as user cancellation map to `OAUTH_CANCELLED`, anything else to
/// `PROVIDER_UNAVAILABLE`.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct LaunchError {
    message: String,
}

impl LaunchError {
    /// Create a launch error with the platform's message.
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }

    /// The platform-provided failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Contract for opening external URLs.
#[async_trait]
pub trait LinkLauncher: Send + Sync {
    /// Whether the platform can open the URL at all. Used as a preflight
    /// before any listener is registered.
    async fn can_open(&self, url: &str) -> bool;

    /// Hand the URL to the platform browser/app.
    async fn open(&self, url: &str) -> Result<(), LaunchError>;
}

/// System launcher backed by the `open` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemLauncher;

#[async_trait]
impl LinkLauncher for SystemLauncher {
    async fn can_open(&self, url: &str) -> bool {
        // The `open` crate exposes no capability query; a well-formed
        // absolute URL is the closest preflight available.
        Url::parse(url).is_ok()
    }

    async fn open(&self, url: &str) -> Result<(), LaunchError> {
        let url = url.to_string();
        tokio::task::spawn_blocking(move || open::that(url))
            .await
            .map_err(|e| LaunchError::new(format!("launcher task failed: {e}")))?
            .map_err(|e| LaunchError::new(format!("failed to open external link: {e}")))
    }
}
