//! User-facing message mapping for the error taxonomy.
//!
//! The UI renders exactly one mapped string per failure, never raw payloads
//! or stack traces. Provider-name substitution applies only where the
//! template names the provider.

use crate::errors::{AuthError, AuthErrorKind};
use crate::types::Provider;

/// Fallback message for unmapped kinds and non-taxonomy failures.
pub const DEFAULT_ERROR_MESSAGE: &str = "Sign-in failed. Try again in a moment.";

/// Map a failure kind to its user-facing message.
///
/// Total over [`AuthErrorKind`]; `provider_name` is substituted only into
/// the templates that mention the provider.
#[must_use]
pub fn kind_message(kind: AuthErrorKind, provider_name: &str) -> String {
    match kind {
        AuthErrorKind::OauthDenied => {
            format!("{provider_name} sign-in was denied. Try a different account.")
        }
        AuthErrorKind::OauthCancelled => {
            "Sign-in was cancelled. Try again to continue.".to_string()
        }
        AuthErrorKind::NetworkError => {
            "Check your network connection and try again.".to_string()
        }
        AuthErrorKind::ProviderUnavailable => {
            format!("Could not open the {provider_name} sign-in window. Try again in a moment.")
        }
        AuthErrorKind::Timeout => "Sign-in is taking too long. Please try again.".to_string(),
        AuthErrorKind::BackendError => {
            "Something went wrong while signing you in. Try again in a moment.".to_string()
        }
        AuthErrorKind::ConfigError => {
            "Sign-in is not configured yet. Please contact support.".to_string()
        }
        AuthErrorKind::NotImplemented => {
            format!("{provider_name} sign-in is coming soon.")
        }
        AuthErrorKind::StateMismatch => {
            "We could not verify the sign-in response. Please try again.".to_string()
        }
        AuthErrorKind::ParsingError => {
            "We could not read the sign-in response. Try again in a moment.".to_string()
        }
        AuthErrorKind::Unknown => DEFAULT_ERROR_MESSAGE.to_string(),
    }
}

/// Map an [`AuthError`] raised during a sign-in attempt to the string the
/// UI shows for `provider`.
#[must_use]
pub fn error_message(provider: Provider, error: &AuthError) -> String {
    kind_message(error.kind(), provider.display_name())
}

/// The generic fallback message, for callers handling non-taxonomy errors.
#[must_use]
pub fn default_error_message() -> &'static str {
    DEFAULT_ERROR_MESSAGE
}
