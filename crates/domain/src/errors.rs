//! Error types used throughout the session subsystem.
//!
//! Every failure path — transport errors, provider SDK errors, backend error
//! codes, user cancellation, state-nonce mismatches — terminates in exactly
//! one [`AuthErrorKind`]. [`AuthError`] is the only error type that crosses
//! component boundaries; raw transport and SDK errors are kept as the
//! `source` for logging and never surface to UI code.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::Provider;

/// Canonical failure kinds surfaced by the session subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthErrorKind {
    OauthDenied,
    OauthCancelled,
    NetworkError,
    ProviderUnavailable,
    Timeout,
    BackendError,
    ConfigError,
    NotImplemented,
    StateMismatch,
    ParsingError,
    Unknown,
}

impl AuthErrorKind {
    /// Stable SCREAMING_SNAKE_CASE code, matching the wire representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OauthDenied => "OAUTH_DENIED",
            Self::OauthCancelled => "OAUTH_CANCELLED",
            Self::NetworkError => "NETWORK_ERROR",
            Self::ProviderUnavailable => "PROVIDER_UNAVAILABLE",
            Self::Timeout => "TIMEOUT",
            Self::BackendError => "BACKEND_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
            Self::StateMismatch => "STATE_MISMATCH",
            Self::ParsingError => "PARSING_ERROR",
            Self::Unknown => "UNKNOWN",
        }
    }
}

impl std::fmt::Display for AuthErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one error type crossing component boundaries.
///
/// Carries the canonical kind, a developer-facing message, the provider the
/// failure belongs to (when known), optional structured details, and the
/// underlying cause for logging.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AuthError {
    kind: AuthErrorKind,
    message: String,
    provider: Option<Provider>,
    details: Option<serde_json::Value>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AuthError {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(kind: AuthErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into(), provider: None, details: None, source: None }
    }

    /// Attach the provider the failure belongs to.
    #[must_use]
    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Attach structured details (state values, backend codes, ...).
    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Attach the underlying cause for logging. Never rendered to users.
    #[must_use]
    pub fn with_source(
        mut self,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        self.source = Some(source.into());
        self
    }

    /// The canonical failure kind.
    #[must_use]
    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    /// Stable SCREAMING_SNAKE_CASE code for the kind.
    #[must_use]
    pub fn code(&self) -> &'static str {
        self.kind.as_str()
    }

    /// Developer-facing message (the user-facing string comes from
    /// [`crate::messages`]).
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Provider the failure belongs to, when known.
    #[must_use]
    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }

    /// Structured details attached at the failure site.
    #[must_use]
    pub fn details(&self) -> Option<&serde_json::Value> {
        self.details.as_ref()
    }
}

/// Result type alias for session subsystem operations.
pub type Result<T, E = AuthError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    //! Unit tests for the error taxonomy.
    use super::*;

    /// Validates the SCREAMING_SNAKE_CASE codes and serde round-trip.
    #[test]
    fn kind_codes_and_serde() {
        assert_eq!(AuthErrorKind::OauthDenied.as_str(), "OAUTH_DENIED");
        assert_eq!(AuthErrorKind::StateMismatch.as_str(), "STATE_MISMATCH");

        let json = serde_json::to_string(&AuthErrorKind::OauthCancelled).unwrap();
        assert_eq!(json, "\"OAUTH_CANCELLED\"");
        let kind: AuthErrorKind = serde_json::from_str("\"PROVIDER_UNAVAILABLE\"").unwrap();
        assert_eq!(kind, AuthErrorKind::ProviderUnavailable);
    }

    /// Validates builder accessors and the display format.
    #[test]
    fn error_builders_and_display() {
        let error = AuthError::new(AuthErrorKind::StateMismatch, "state did not match")
            .with_provider(Provider::Kakao)
            .with_details(serde_json::json!({
                "expectedState": "ABC123",
                "receivedState": "WRONG",
            }));

        assert_eq!(error.kind(), AuthErrorKind::StateMismatch);
        assert_eq!(error.code(), "STATE_MISMATCH");
        assert_eq!(error.provider(), Some(Provider::Kakao));
        assert_eq!(
            error.details().and_then(|d| d["expectedState"].as_str()),
            Some("ABC123")
        );
        assert_eq!(error.to_string(), "STATE_MISMATCH: state did not match");
    }

    /// Validates that an attached cause is reachable via `Error::source`.
    #[test]
    fn error_source_chain() {
        let cause = std::io::Error::new(std::io::ErrorKind::TimedOut, "socket timed out");
        let error = AuthError::new(AuthErrorKind::NetworkError, "request failed")
            .with_source(cause);

        let source = std::error::Error::source(&error).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("socket timed out"));
    }
}
