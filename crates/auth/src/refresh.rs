//! Session refresh client.
//!
//! Exchanges a stored refresh token for a new token pair at
//! `POST /auth/refresh`. Failures stay as [`RefreshError`] rather than the
//! boundary taxonomy so the session store can tell a refresh-specific
//! failure (which ends the session with a "session expired" message) from
//! other failures.

use std::time::Duration;

use async_trait::async_trait;
use rewear_domain::TokenPair;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

/// Backend path for the refresh exchange. The authenticated API client must
/// never intercept requests to this path.
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Failure of a refresh exchange.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The request never produced a usable response.
    #[error("token refresh request failed")]
    RequestFailed(#[source] reqwest::Error),

    /// The backend rejected the refresh token.
    #[error("token refresh rejected with status {status}")]
    Rejected { status: u16 },
}

/// Contract for exchanging a refresh token for a new pair.
#[async_trait]
pub trait SessionRefresher: Send + Sync {
    /// Exchange `refresh_token` for a fresh [`TokenPair`].
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest<'a> {
    refresh_token: &'a str,
}

/// HTTP refresh client.
///
/// Uses its own plain `reqwest` client: the refresh exchange must never run
/// through the bearer-attaching API client, or a failing refresh would
/// trigger itself.
pub struct RefreshTokenClient {
    http: reqwest::Client,
    base_url: String,
}

impl RefreshTokenClient {
    /// Create a client against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.into() }
    }
}

#[async_trait]
impl SessionRefresher for RefreshTokenClient {
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, RefreshError> {
        let url = format!("{}{}", self.base_url, REFRESH_ENDPOINT);
        debug!("refreshing session tokens");

        let response = self
            .http
            .post(&url)
            .json(&RefreshRequest { refresh_token })
            .send()
            .await
            .map_err(RefreshError::RequestFailed)?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "refresh token was rejected");
            return Err(RefreshError::Rejected { status: status.as_u16() });
        }

        response.json::<TokenPair>().await.map_err(RefreshError::RequestFailed)
    }
}
