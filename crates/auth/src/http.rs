//! Authenticated API client.
//!
//! Attaches the session's bearer token to outgoing requests and, on an auth
//! error, performs exactly one refresh-and-replay. Requests to the refresh
//! endpoint itself are never intercepted — that would let a failing refresh
//! trigger itself.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rewear_domain::{AuthError, AuthErrorKind, Result};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, instrument};

use crate::refresh::{SessionRefresher, REFRESH_ENDPOINT};
use crate::session::SessionStore;
use crate::storage::TokenStorage;

/// Seam between the API client and the session store.
#[async_trait]
pub trait SessionHandle: Send + Sync {
    /// Current in-memory access token, if any.
    fn current_access_token(&self) -> Option<String>;

    /// Run the single-flighted session refresh; `None` means the session
    /// ended.
    async fn refresh_session(&self) -> Option<String>;
}

#[async_trait]
impl<S, R> SessionHandle for SessionStore<S, R>
where
    S: TokenStorage + 'static,
    R: SessionRefresher + 'static,
{
    fn current_access_token(&self) -> Option<String> {
        self.snapshot().access_token
    }

    async fn refresh_session(&self) -> Option<String> {
        SessionStore::refresh_session(self).await
    }
}

/// JSON API client carrying the session's bearer credential.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn SessionHandle>,
}

impl ApiClient {
    /// Create a client against the given API base URL.
    pub fn new(base_url: impl Into<String>, session: Arc<dyn SessionHandle>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.into(), session }
    }

    /// Execute a GET request.
    ///
    /// # Errors
    /// Returns the mapped failure when the request fails, the backend
    /// rejects it, or the body cannot be parsed.
    #[instrument(skip(self), fields(path = %path))]
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.execute(Method::GET, path, None).await?;
        Self::decode(response, path).await
    }

    /// Execute a POST request with a JSON body.
    ///
    /// # Errors
    /// Returns the mapped failure when the request fails, the backend
    /// rejects it, or either body cannot be (de)serialized.
    #[instrument(skip(self, body), fields(path = %path))]
    pub async fn post<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        let body = serde_json::to_value(body).map_err(|error| {
            AuthError::new(AuthErrorKind::ParsingError, "failed to serialize request body")
                .with_source(error)
        })?;
        let response = self.execute(Method::POST, path, Some(body)).await?;
        Self::decode(response, path).await
    }

    async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let intercepted = path != REFRESH_ENDPOINT;
        let mut bearer = if intercepted { self.session.current_access_token() } else { None };
        // One-shot: set before the replay so a 401 on the replay can never
        // trigger a second refresh.
        let mut refreshed = false;

        loop {
            let mut request = self.http.request(method.clone(), &url);
            if let Some(token) = &bearer {
                request = request.bearer_auth(token);
            }
            if let Some(body) = &body {
                request = request.json(body);
            }

            let response = request.send().await.map_err(|error| {
                AuthError::new(AuthErrorKind::NetworkError, "request failed without a response")
                    .with_source(error)
            })?;

            let status = response.status();
            let auth_failure =
                status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN;
            if intercepted && !refreshed && auth_failure {
                refreshed = true;
                debug!(%path, status = status.as_u16(), "auth error, refreshing session");
                if let Some(fresh) = self.session.refresh_session().await {
                    bearer = Some(fresh);
                    continue;
                }
                // Refresh resolved to no session: surface the original
                // failure.
            }

            return Ok(response);
        }
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response, path: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::new(
                AuthErrorKind::BackendError,
                format!("request to {path} failed"),
            )
            .with_details(json!({ "status": status.as_u16() })));
        }

        response.json().await.map_err(|error| {
            AuthError::new(AuthErrorKind::ParsingError, "failed to parse response body")
                .with_source(error)
        })
    }
}
