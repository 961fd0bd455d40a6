//! Redirect-based authorization flow controller.
//!
//! Opens the provider's authorization page externally, then waits for the
//! first of: a matching app-link callback, the attempt timeout, or a launch
//! failure. The `select!` loop below is the settle-once guard — returning
//! settles the attempt, drops the subscription and the timer, and turns any
//! later callback or timer signal into a no-op.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use rewear_domain::{AuthError, AuthErrorKind, AuthorizationResult, Provider, Result};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use url::Url;

use super::launcher::{LaunchError, LinkLauncher};
use super::links::AppLinkBus;

/// Default time budget for one authorization attempt.
pub const DEFAULT_REDIRECT_TIMEOUT: Duration = Duration::from_secs(60);

const STATE_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
const STATE_LENGTH: usize = 32;

/// Generate the anti-forgery state nonce for one authorization attempt.
#[must_use]
pub fn generate_login_state() -> String {
    let mut rng = rand::thread_rng();
    (0..STATE_LENGTH)
        .map(|_| {
            let index = rng.gen_range(0..STATE_ALPHABET.len());
            STATE_ALPHABET[index] as char
        })
        .collect()
}

/// One authorization attempt, created per login and consumed exactly once.
#[derive(Debug, Clone)]
pub struct RedirectFlowRequest {
    /// Full authorization-request URL to open externally.
    pub authorization_url: String,
    /// Expected redirect URI; callbacks not starting with this are ignored.
    pub redirect_uri: String,
    /// State nonce expected back in the callback.
    pub state: String,
    /// Provider the attempt belongs to, for error attribution.
    pub provider: Provider,
    /// Attempt timeout; defaults to [`DEFAULT_REDIRECT_TIMEOUT`].
    pub timeout: Option<Duration>,
}

/// Run one redirect authorization attempt to completion.
///
/// # Errors
/// - `PROVIDER_UNAVAILABLE` when the platform cannot open the URL (preflight
///   or launch failure), `OAUTH_CANCELLED` when the launch failure reads as
///   a user cancellation;
/// - `TIMEOUT` when no matching callback arrives in time;
/// - `STATE_MISMATCH`, `OAUTH_DENIED`, `OAUTH_CANCELLED`, `UNKNOWN`, or
///   `PARSING_ERROR` depending on the callback contents.
pub async fn start_redirect_flow(
    launcher: &dyn LinkLauncher,
    links: &AppLinkBus,
    request: RedirectFlowRequest,
) -> Result<AuthorizationResult> {
    let provider = request.provider;
    let timeout = request.timeout.unwrap_or(DEFAULT_REDIRECT_TIMEOUT);

    // Preflight: abort before any listener registers.
    if !launcher.can_open(&request.authorization_url).await {
        warn!(%provider, "platform cannot open authorization url");
        return Err(AuthError::new(
            AuthErrorKind::ProviderUnavailable,
            "platform cannot open the authorization url",
        )
        .with_provider(provider)
        .with_details(json!({ "authorizationUrl": request.authorization_url })));
    }

    // Listener and timer must exist before navigating away.
    let mut callbacks = links.subscribe();
    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let open = launcher.open(&request.authorization_url);
    tokio::pin!(open);
    let mut launched = false;
    let mut listening = true;

    debug!(%provider, timeout_secs = timeout.as_secs(), "starting redirect authorization flow");

    loop {
        tokio::select! {
            () = &mut deadline => {
                warn!(%provider, "authorization attempt timed out");
                return Err(AuthError::new(
                    AuthErrorKind::Timeout,
                    "authorization attempt timed out",
                )
                .with_provider(provider));
            }
            result = &mut open, if !launched => match result {
                Ok(()) => launched = true,
                Err(error) => return Err(map_open_failure(provider, error)),
            },
            incoming = callbacks.recv(), if listening => match incoming {
                Ok(url) => {
                    if !url.starts_with(&request.redirect_uri) {
                        debug!(%provider, "ignoring app link outside the redirect uri");
                        continue;
                    }
                    info!(%provider, "received authorization callback");
                    return parse_callback(&url, &request.state, provider);
                }
                // Lagged receivers skip missed links; a closed bus leaves
                // the timeout to settle the attempt.
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%provider, skipped, "app link listener lagged");
                }
                Err(RecvError::Closed) => listening = false,
            },
        }
    }
}

fn map_open_failure(provider: Provider, error: LaunchError) -> AuthError {
    let kind = if error.message().to_lowercase().contains("cancel") {
        AuthErrorKind::OauthCancelled
    } else {
        AuthErrorKind::ProviderUnavailable
    };

    AuthError::new(kind, "failed to launch the external sign-in page")
        .with_provider(provider)
        .with_source(error)
}

fn parse_callback(
    incoming: &str,
    expected_state: &str,
    provider: Provider,
) -> Result<AuthorizationResult> {
    let parsed = Url::parse(incoming).map_err(|error| {
        AuthError::new(AuthErrorKind::ParsingError, "failed to parse authorization callback")
            .with_provider(provider)
            .with_source(error)
    })?;

    let params: HashMap<String, String> = parsed.query_pairs().into_owned().collect();

    let returned_state = params.get("state").cloned();
    if let Some(received) = returned_state.as_deref() {
        if received != expected_state {
            return Err(AuthError::new(
                AuthErrorKind::StateMismatch,
                "authorization callback state did not match",
            )
            .with_provider(provider)
            .with_details(json!({
                "expectedState": expected_state,
                "receivedState": received,
            })));
        }
    }

    if let Some(error) = params.get("error") {
        return Err(match error.to_lowercase().as_str() {
            "access_denied" => {
                AuthError::new(AuthErrorKind::OauthDenied, "authorization was denied")
                    .with_provider(provider)
            }
            "user_cancelled" => {
                AuthError::new(AuthErrorKind::OauthCancelled, "authorization was cancelled")
                    .with_provider(provider)
            }
            _ => AuthError::new(AuthErrorKind::Unknown, "authorization failed")
                .with_provider(provider)
                .with_details(json!({ "error": error })),
        });
    }

    let Some(code) = params.get("code") else {
        return Err(AuthError::new(
            AuthErrorKind::ParsingError,
            "authorization callback carried no code",
        )
        .with_provider(provider)
        .with_details(json!({ "incomingUrl": incoming })));
    };

    Ok(AuthorizationResult { code: code.clone(), state: returned_state })
}

#[cfg(test)]
mod tests {
    //! Unit tests for the redirect flow controller. Timer-sensitive cases
    //! run under paused time.
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    struct MockLauncher {
        openable: bool,
        open_error: Mutex<Option<LaunchError>>,
    }

    impl MockLauncher {
        fn working() -> Self {
            Self { openable: true, open_error: Mutex::new(None) }
        }

        fn failing_open(message: &str) -> Self {
            Self { openable: true, open_error: Mutex::new(Some(LaunchError::new(message))) }
        }

        fn unopenable() -> Self {
            Self { openable: false, open_error: Mutex::new(None) }
        }
    }

    #[async_trait]
    impl LinkLauncher for MockLauncher {
        async fn can_open(&self, _url: &str) -> bool {
            self.openable
        }

        async fn open(&self, _url: &str) -> Result<(), LaunchError> {
            match self.open_error.lock().unwrap().take() {
                Some(error) => Err(error),
                None => Ok(()),
            }
        }
    }

    fn request(state: &str) -> RedirectFlowRequest {
        RedirectFlowRequest {
            authorization_url: "https://kauth.kakao.com/oauth/authorize?state=ABC123".to_string(),
            redirect_uri: "app://auth/callback".to_string(),
            state: state.to_string(),
            provider: Provider::Kakao,
            timeout: None,
        }
    }

    async fn settle_subscriptions() {
        // Under paused time this advances the clock 1ms once the flow task
        // is parked on its select, guaranteeing the subscription exists
        // before any publish below.
        tokio::time::sleep(Duration::from_millis(1)).await;
    }

    /// Validates the documented scenario: `state=ABC123` echoed back with a
    /// code resolves `{code: "XYZ", state: "ABC123"}`.
    #[tokio::test(start_paused = true)]
    async fn matching_callback_resolves() {
        let bus = AppLinkBus::new();
        let flow = {
            let bus = bus.clone();
            tokio::spawn(async move {
                start_redirect_flow(&MockLauncher::working(), &bus, request("ABC123")).await
            })
        };
        settle_subscriptions().await;

        bus.publish("app://auth/callback?code=XYZ&state=ABC123");

        let result = flow.await.unwrap().unwrap();
        assert_eq!(result.code, "XYZ");
        assert_eq!(result.state.as_deref(), Some("ABC123"));
    }

    /// Validates callbacks outside the redirect uri are ignored and the
    /// flow keeps waiting for a real one.
    #[tokio::test(start_paused = true)]
    async fn foreign_links_are_ignored() {
        let bus = AppLinkBus::new();
        let flow = {
            let bus = bus.clone();
            tokio::spawn(async move {
                start_redirect_flow(&MockLauncher::working(), &bus, request("ABC123")).await
            })
        };
        settle_subscriptions().await;

        bus.publish("app://share/post/42");
        bus.publish("https://example.com/?code=nope");
        settle_subscriptions().await;
        bus.publish("app://auth/callback?code=XYZ&state=ABC123");

        let result = flow.await.unwrap().unwrap();
        assert_eq!(result.code, "XYZ");
    }

    /// Validates a mismatched state settles with `STATE_MISMATCH` carrying
    /// both values, and that later callbacks are no-ops.
    #[tokio::test(start_paused = true)]
    async fn state_mismatch_settles_once() {
        let bus = AppLinkBus::new();
        let flow = {
            let bus = bus.clone();
            tokio::spawn(async move {
                start_redirect_flow(&MockLauncher::working(), &bus, request("ABC123")).await
            })
        };
        settle_subscriptions().await;

        bus.publish("app://auth/callback?code=XYZ&state=WRONG");

        let error = flow.await.unwrap().unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::StateMismatch);
        let details = error.details().unwrap();
        assert_eq!(details["expectedState"], "ABC123");
        assert_eq!(details["receivedState"], "WRONG");

        // The attempt settled: a matching callback now has no listener.
        assert_eq!(bus.publish("app://auth/callback?code=XYZ&state=ABC123"), 0);
    }

    /// Validates provider error params map onto the taxonomy.
    #[tokio::test(start_paused = true)]
    async fn error_params_map_to_taxonomy() {
        for (param, expected) in [
            ("access_denied", AuthErrorKind::OauthDenied),
            ("user_cancelled", AuthErrorKind::OauthCancelled),
            ("server_error", AuthErrorKind::Unknown),
        ] {
            let bus = AppLinkBus::new();
            let flow = {
                let bus = bus.clone();
                tokio::spawn(async move {
                    start_redirect_flow(&MockLauncher::working(), &bus, request("ABC123")).await
                })
            };
            settle_subscriptions().await;

            bus.publish(format!("app://auth/callback?error={param}&state=ABC123"));

            let error = flow.await.unwrap().unwrap_err();
            assert_eq!(error.kind(), expected, "error param {param}");
            if expected == AuthErrorKind::Unknown {
                assert_eq!(error.details().unwrap()["error"], param);
            }
        }
    }

    /// Validates a callback without a code fails `PARSING_ERROR`.
    #[tokio::test(start_paused = true)]
    async fn missing_code_is_parsing_error() {
        let bus = AppLinkBus::new();
        let flow = {
            let bus = bus.clone();
            tokio::spawn(async move {
                start_redirect_flow(&MockLauncher::working(), &bus, request("ABC123")).await
            })
        };
        settle_subscriptions().await;

        bus.publish("app://auth/callback?state=ABC123");

        let error = flow.await.unwrap().unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::ParsingError);
    }

    /// Validates an unsettled attempt times out after the configured
    /// budget.
    #[tokio::test(start_paused = true)]
    async fn unsettled_attempt_times_out() {
        let bus = AppLinkBus::new();
        let started = tokio::time::Instant::now();

        let mut req = request("ABC123");
        req.timeout = Some(Duration::from_secs(5));
        let error = start_redirect_flow(&MockLauncher::working(), &bus, req)
            .await
            .unwrap_err();

        assert_eq!(error.kind(), AuthErrorKind::Timeout);
        assert_eq!(started.elapsed(), Duration::from_secs(5));
    }

    /// Validates the preflight aborts with `PROVIDER_UNAVAILABLE` before
    /// any listener registers.
    #[tokio::test(start_paused = true)]
    async fn preflight_failure_aborts() {
        let bus = AppLinkBus::new();
        let error = start_redirect_flow(&MockLauncher::unopenable(), &bus, request("ABC123"))
            .await
            .unwrap_err();

        assert_eq!(error.kind(), AuthErrorKind::ProviderUnavailable);
        assert!(error.details().unwrap()["authorizationUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://kauth.kakao.com"));
    }

    /// Validates launch failures map to cancellation or unavailability by
    /// message.
    #[tokio::test(start_paused = true)]
    async fn open_failure_classification() {
        let bus = AppLinkBus::new();
        let error = start_redirect_flow(
            &MockLauncher::failing_open("Operation was cancelled by the user"),
            &bus,
            request("ABC123"),
        )
        .await
        .unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::OauthCancelled);

        let error = start_redirect_flow(
            &MockLauncher::failing_open("no handler registered for scheme"),
            &bus,
            request("ABC123"),
        )
        .await
        .unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::ProviderUnavailable);
    }

    /// Validates the state nonce generator shape.
    #[test]
    fn login_state_shape() {
        let state = generate_login_state();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(generate_login_state(), generate_login_state());
    }
}
