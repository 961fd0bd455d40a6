//! Session store: the single writer of session state.
//!
//! Owns the current access token, user stub, and lifecycle status. State is
//! held in a `watch` channel — consumers read snapshots or subscribe, and
//! the operations below are the only mutation entry points. Hydrate and
//! refresh each run through their own single-flight slot: at most one of
//! each is in flight process-wide, and concurrent requesters share the
//! identical outcome. A hydrate in flight never blocks a refresh.

use std::sync::Arc;

use rewear_domain::{
    AuthError, AuthErrorKind, LoginResponse, Result, SessionState, SessionStatus, TokenPair,
    UserStub,
};
use tokio::sync::watch;
use tracing::{debug, error, info};

use super::single_flight::SingleFlight;
use crate::refresh::SessionRefresher;
use crate::storage::{StorageError, TokenStorage};

/// Reason recorded when a session is ended by a failed refresh.
pub const SESSION_EXPIRED_MESSAGE: &str = "Your session has expired. Please sign in again.";

/// Single-writer state container for the client session.
pub struct SessionStore<S, R> {
    inner: Arc<Inner<S, R>>,
}

impl<S, R> Clone for SessionStore<S, R> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

struct Inner<S, R> {
    storage: S,
    refresher: R,
    state: watch::Sender<SessionState>,
    hydrate_flight: SingleFlight<SessionStatus>,
    refresh_flight: SingleFlight<Option<String>>,
}

impl<S, R> SessionStore<S, R>
where
    S: TokenStorage + 'static,
    R: SessionRefresher + 'static,
{
    /// Create a store in the `Idle` cold-start state.
    pub fn new(storage: S, refresher: R) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                storage,
                refresher,
                state,
                hydrate_flight: SingleFlight::new(),
                refresh_flight: SingleFlight::new(),
            }),
        }
    }

    /// Current state snapshot.
    #[must_use]
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Record a completed social sign-in.
    ///
    /// Persists the refresh token first, then atomically applies the new
    /// access token, user stub, and `Authenticated` status.
    ///
    /// # Errors
    /// Fails without touching state when the refresh token cannot be
    /// persisted.
    pub async fn login_success(&self, payload: &LoginResponse) -> Result<()> {
        let tokens = &payload.tokens;
        self.inner.storage.store(&tokens.refresh_token).await.map_err(|error| {
            error!(%error, provider = %payload.provider, "failed to persist refresh token after login");
            AuthError::new(AuthErrorKind::Unknown, "failed to persist the session credential")
                .with_provider(payload.provider)
                .with_source(error)
        })?;

        let access_token = tokens.access_token.clone();
        let user = payload.user.clone();
        self.inner.update(move |state| {
            state.access_token = Some(access_token);
            state.user = user;
            state.status = SessionStatus::Authenticated;
            state.is_hydrated = true;
            state.last_error = None;
        });

        info!(
            provider = %payload.provider,
            expires_in = ?tokens.expires_in,
            refresh_expires_in = ?tokens.refresh_expires_in,
            "login succeeded"
        );
        Ok(())
    }

    /// Rebuild the session from the persisted refresh token.
    ///
    /// Single-flighted: concurrent callers share the in-flight result, and a
    /// later call re-runs from scratch. With no stored token this resolves
    /// `Unauthenticated` immediately, with zero network calls.
    pub async fn hydrate(&self) -> SessionStatus {
        let inner = Arc::clone(&self.inner);
        self.inner.hydrate_flight.run(move || Inner::run_hydrate(inner)).await
    }

    /// Exchange the stored refresh token for a new access token.
    ///
    /// Single-flighted independently of [`hydrate`](Self::hydrate). Returns
    /// the new access token, or `None` after logging out (no stored token,
    /// or the refresh failed).
    pub async fn refresh_session(&self) -> Option<String> {
        let inner = Arc::clone(&self.inner);
        self.inner.refresh_flight.run(move || Inner::run_refresh(inner)).await
    }

    /// End the session: clear the persisted token and reset state.
    pub async fn logout(&self, reason: Option<String>) {
        self.inner.do_logout(reason).await;
    }

    /// Replace the user stub without touching the credential state.
    pub fn set_user(&self, user: Option<UserStub>) {
        self.inner.update(move |state| state.user = user);
    }

    /// Clear the last recorded error.
    pub fn clear_error(&self) {
        self.inner.update(|state| state.last_error = None);
    }
}

impl<S, R> Inner<S, R>
where
    S: TokenStorage + 'static,
    R: SessionRefresher + 'static,
{
    fn update(&self, mutate: impl FnOnce(&mut SessionState)) {
        self.state.send_modify(mutate);
    }

    async fn run_hydrate(self: Arc<Self>) -> SessionStatus {
        self.update(|state| {
            state.status = SessionStatus::Hydrating;
            state.last_error = None;
        });

        let Some(refresh_token) = self.storage.read().await else {
            debug!("no stored refresh token, resolving unauthenticated");
            self.reset_unauthenticated(None);
            return SessionStatus::Unauthenticated;
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(pair) => match self.apply_token_pair(&pair).await {
                Ok(()) => {
                    self.update(|state| {
                        state.status = SessionStatus::Authenticated;
                        state.is_hydrated = true;
                        state.last_error = None;
                    });
                    info!("session hydrated");
                    SessionStatus::Authenticated
                }
                Err(error) => {
                    error!(%error, "failed to persist rotated refresh token during hydrate");
                    self.clear_stored_token().await;
                    self.reset_unauthenticated(None);
                    SessionStatus::Unauthenticated
                }
            },
            Err(error) => {
                error!(%error, "failed to hydrate session");
                self.clear_stored_token().await;
                self.reset_unauthenticated(Some(SESSION_EXPIRED_MESSAGE.to_string()));
                SessionStatus::Unauthenticated
            }
        }
    }

    async fn run_refresh(self: Arc<Self>) -> Option<String> {
        let Some(refresh_token) = self.storage.read().await else {
            debug!("refresh requested without a stored token, logging out");
            self.do_logout(None).await;
            return None;
        };

        match self.refresher.refresh(&refresh_token).await {
            Ok(pair) => match self.apply_token_pair(&pair).await {
                Ok(()) => {
                    self.update(|state| {
                        state.status = SessionStatus::Authenticated;
                        state.is_hydrated = true;
                        state.last_error = None;
                    });
                    Some(pair.access_token)
                }
                Err(error) => {
                    error!(%error, "failed to persist rotated refresh token");
                    self.do_logout(None).await;
                    None
                }
            },
            Err(error) => {
                error!(%error, "token refresh failed");
                self.do_logout(Some(SESSION_EXPIRED_MESSAGE.to_string())).await;
                None
            }
        }
    }

    /// Persist the rotated refresh token, then swap the access token in.
    async fn apply_token_pair(&self, pair: &TokenPair) -> std::result::Result<(), StorageError> {
        self.storage.store(&pair.refresh_token).await?;
        let access_token = pair.access_token.clone();
        self.update(move |state| state.access_token = Some(access_token));
        Ok(())
    }

    async fn do_logout(&self, reason: Option<String>) {
        self.clear_stored_token().await;
        self.reset_unauthenticated(reason);
    }

    async fn clear_stored_token(&self) {
        if let Err(error) = self.storage.clear().await {
            // A stuck keychain entry must not wedge the state machine; the
            // in-memory session still resets.
            error!(%error, "failed to clear stored refresh token");
        }
    }

    fn reset_unauthenticated(&self, last_error: Option<String>) {
        self.update(move |state| {
            *state = SessionState {
                access_token: None,
                user: None,
                status: SessionStatus::Unauthenticated,
                is_hydrated: true,
                last_error,
            };
        });
    }
}
