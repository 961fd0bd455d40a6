//! Native provider SDK adapter.
//!
//! Attempts the in-app native login first (the provider app hand-off) and
//! falls back to the SDK's account-based web login when the app is absent or
//! unsupported. Everything the SDK throws is classified structurally — an
//! optional code plus an optional message — into the error taxonomy; the
//! classifier is total and never panics.

use async_trait::async_trait;
use rewear_domain::{AuthError, AuthErrorKind, Provider, Result};
use tracing::{debug, warn};

/// Structural error shape surfaced by native provider SDKs.
///
/// SDK bridges report failures as bare strings, `{code, message}` pairs, or
/// richer objects; only these two fields matter for classification.
#[derive(Debug, Clone, Default)]
pub struct NativeSdkError {
    pub code: Option<String>,
    pub message: Option<String>,
}

impl NativeSdkError {
    /// Failure with both a code and a message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: Some(message.into()) }
    }

    /// Failure identified only by a code.
    pub fn from_code(code: impl Into<String>) -> Self {
        Self { code: Some(code.into()), message: None }
    }

    /// Failure carrying only a message (bare-string errors).
    pub fn from_message(message: impl Into<String>) -> Self {
        Self { code: None, message: Some(message.into()) }
    }
}

impl From<&str> for NativeSdkError {
    fn from(message: &str) -> Self {
        Self::from_message(message)
    }
}

impl From<String> for NativeSdkError {
    fn from(message: String) -> Self {
        Self::from_message(message)
    }
}

impl std::fmt::Display for NativeSdkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{code}: {message}"),
            (Some(code), None) => f.write_str(code),
            (None, Some(message)) => f.write_str(message),
            (None, None) => f.write_str("native sdk error"),
        }
    }
}

impl std::error::Error for NativeSdkError {}

/// Token payload returned by a native SDK login.
#[derive(Debug, Clone, Default)]
pub struct NativeTokenPayload {
    /// OpenID Connect identity token; the only field the core consumes.
    pub id_token: Option<String>,
    /// Provider access token, unused by the session subsystem.
    pub access_token: Option<String>,
}

/// Contract for a provider's native SDK.
#[async_trait]
pub trait NativeAuthSdk: Send + Sync {
    /// In-app login via the installed provider app.
    async fn login(&self) -> std::result::Result<NativeTokenPayload, NativeSdkError>;

    /// Account-based web login inside the SDK, used as the fallback when
    /// the provider app is unavailable.
    async fn login_with_account(&self)
        -> std::result::Result<NativeTokenPayload, NativeSdkError>;
}

/// Acquire an identity token via the native SDK, falling back to the
/// account login when the provider app is absent or unsupported.
///
/// # Errors
/// Native failures map directly onto the taxonomy (no fallback) unless they
/// signal an absent/unsupported app. A blank identity token from the
/// fallback path is a `BACKEND_ERROR`, distinct from native-path failures.
pub async fn acquire_identity_token(
    sdk: &dyn NativeAuthSdk,
    provider: Provider,
) -> Result<String> {
    match sdk.login().await {
        Ok(payload) => {
            if let Some(token) = extract_id_token(&payload) {
                return Ok(token);
            }
            debug!(%provider, "native login returned no identity token, trying account login");
        }
        Err(error) => {
            if !wants_account_fallback(&error) {
                return Err(map_native_error(provider, error));
            }
            debug!(%provider, %error, "provider app unavailable, falling back to account login");
        }
    }

    match sdk.login_with_account().await {
        Ok(payload) => extract_id_token(&payload).ok_or_else(|| {
            warn!(%provider, "account login returned a blank identity token");
            AuthError::new(
                AuthErrorKind::BackendError,
                "native sign-in returned no identity token",
            )
            .with_provider(provider)
        }),
        Err(error) => Err(map_native_error(provider, error)),
    }
}

/// Treat blank or whitespace-only identity tokens as absent.
fn extract_id_token(payload: &NativeTokenPayload) -> Option<String> {
    payload
        .id_token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Whether the failure signals an absent or unsupported provider app.
fn wants_account_fallback(error: &NativeSdkError) -> bool {
    if let Some(code) = &error.code {
        let code = code.to_uppercase();
        if code == "E_KAKAOTALK_NOT_INSTALLED" || code == "E_NOT_SUPPORTED" {
            return true;
        }
    }

    let Some(message) = &error.message else {
        return false;
    };
    let message = message.to_uppercase();
    message.contains("KAKAOTALK")
        && (message.contains("NOT INSTALLED")
            || message.contains("NOT_INSTALLED")
            || message.contains("UNAVAILABLE"))
}

/// Classify a native SDK failure into the error taxonomy.
fn map_native_error(provider: Provider, error: NativeSdkError) -> AuthError {
    let code = error.code.as_deref().map(str::to_uppercase);
    let message = error.message.as_deref().map(str::to_uppercase);
    let code = code.as_deref();
    let message = message.as_deref();

    let (kind, text) = if code.is_some_and(|c| c.contains("CANCEL"))
        || message.is_some_and(|m| m.contains("CANCEL"))
    {
        (AuthErrorKind::OauthCancelled, "native sign-in was cancelled")
    } else if code == Some("E_IN_PROGRESS_OPERATION") {
        (
            AuthErrorKind::ProviderUnavailable,
            "a native sign-in is already in progress, try again later",
        )
    } else if code == Some("E_NETWORK_ERROR") || message.is_some_and(|m| m.contains("NETWORK")) {
        (AuthErrorKind::NetworkError, "native sign-in hit a network failure")
    } else {
        (AuthErrorKind::ProviderUnavailable, "native sign-in failed")
    };

    AuthError::new(kind, text).with_provider(provider).with_source(error)
}
