//! Token exchange client.
//!
//! Trades an authorization code (redirect flow) or a native identity token
//! for a backend-issued token pair. Transport failures and 5xx responses
//! get a bounded retry; backend error codes map through a fixed table into
//! the error taxonomy, with the raw code preserved for diagnostics.

use std::time::Duration;

use rewear_domain::{
    AuthError, AuthErrorKind, AuthorizationResult, LoginResponse, Provider, Result, TokenPair,
    UserStub,
};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::providers::ResolvedProviderConfig;
use crate::retry::{self, RetryConfig};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Successful payload of the backend callback endpoints.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackSuccessBody {
    access_token: String,
    refresh_token: String,
    expires_in: Option<i64>,
    refresh_expires_in: Option<i64>,
    is_new_user: Option<bool>,
    user: Option<UserStub>,
}

/// Error payload of the backend callback endpoints.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallbackErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// One failed exchange attempt, classified for the retry predicate.
#[derive(Debug)]
enum AttemptError {
    /// No usable response: connection failures and transport timeouts.
    Transport(reqwest::Error),
    /// The backend answered with a non-success status.
    Status { status: StatusCode, body: Option<CallbackErrorBody> },
    /// A success status whose body could not be read.
    Parse(reqwest::Error),
}

impl AttemptError {
    /// Retry on missing responses, transport timeouts, and 5xx — never on
    /// 4xx.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Status { status, .. } => status.is_server_error(),
            Self::Parse(_) => false,
        }
    }
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transport(error) => write!(f, "transport failure: {error}"),
            Self::Status { status, .. } => write!(f, "backend responded with {status}"),
            Self::Parse(error) => write!(f, "unreadable response body: {error}"),
        }
    }
}

/// Client for the backend's social-login callback endpoints.
pub struct TokenExchangeClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl TokenExchangeClient {
    /// Create a client against the given API base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { http, base_url: base_url.into(), retry: RetryConfig::default() }
    }

    /// Override the retry behavior (tests shorten the delays).
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Exchange an authorization code captured by the redirect flow.
    ///
    /// # Errors
    /// `CONFIG_ERROR` when the resolved config lacks a redirect uri, else
    /// the mapped exchange failure.
    pub async fn exchange_authorization_code(
        &self,
        config: &ResolvedProviderConfig,
        authorization: &AuthorizationResult,
    ) -> Result<LoginResponse> {
        let Some(redirect_uri) = &config.redirect_uri else {
            return Err(AuthError::new(
                AuthErrorKind::ConfigError,
                "cannot exchange an authorization code without a redirect uri",
            )
            .with_provider(config.provider));
        };

        let body = json!({
            "code": authorization.code,
            "state": authorization.state,
            "redirectUri": redirect_uri,
        });
        self.post_callback(config.provider, &config.callback_path, body).await
    }

    /// Exchange a native SDK identity token.
    pub async fn exchange_identity_token(
        &self,
        config: &ResolvedProviderConfig,
        id_token: &str,
    ) -> Result<LoginResponse> {
        let path = config
            .native_callback_path
            .clone()
            .unwrap_or_else(|| config.callback_path.clone());
        self.post_callback(config.provider, &path, json!({ "idToken": id_token })).await
    }

    async fn post_callback(
        &self,
        provider: Provider,
        path: &str,
        body: serde_json::Value,
    ) -> Result<LoginResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%provider, %path, "exchanging credential for token pair");

        let outcome = retry::execute(
            &self.retry,
            || self.attempt(&url, &body),
            |error: &AttemptError, _attempt| error.is_retryable(),
        )
        .await;

        match outcome {
            Ok(success) => {
                info!(%provider, is_new_user = ?success.is_new_user, "token exchange succeeded");
                Ok(LoginResponse {
                    provider,
                    tokens: TokenPair {
                        access_token: success.access_token,
                        refresh_token: success.refresh_token,
                        expires_in: success.expires_in,
                        refresh_expires_in: success.refresh_expires_in,
                    },
                    is_new_user: success.is_new_user,
                    user: success.user,
                })
            }
            Err(error) => Err(map_exchange_error(provider, error)),
        }
    }

    async fn attempt(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> std::result::Result<CallbackSuccessBody, AttemptError> {
        let response = self
            .http
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(AttemptError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.json::<CallbackErrorBody>().await.ok();
            return Err(AttemptError::Status { status, body });
        }

        response.json().await.map_err(AttemptError::Parse)
    }
}

/// Map an exhausted exchange failure into the taxonomy.
fn map_exchange_error(provider: Provider, error: AttemptError) -> AuthError {
    match error {
        AttemptError::Transport(source) => {
            AuthError::new(AuthErrorKind::NetworkError, "could not reach the authentication backend")
                .with_provider(provider)
                .with_source(source)
        }
        AttemptError::Parse(source) => {
            AuthError::new(AuthErrorKind::ParsingError, "could not parse the login response")
                .with_provider(provider)
                .with_source(source)
        }
        AttemptError::Status { status, body } => {
            let body = body.unwrap_or_default();
            let kind = body
                .code
                .as_deref()
                .map(map_backend_code)
                .unwrap_or(AuthErrorKind::BackendError);

            AuthError::new(kind, "the backend rejected the login exchange")
                .with_provider(provider)
                .with_details(json!({
                    "status": status.as_u16(),
                    "backendCode": body.code,
                    "backendMessage": body.message,
                }))
        }
    }
}

/// Fixed mapping of backend error codes onto the taxonomy. Unrecognized
/// codes fall through to `BACKEND_ERROR`; the raw code stays in the error
/// details.
fn map_backend_code(code: &str) -> AuthErrorKind {
    match code {
        "OAUTH_DENIED" => AuthErrorKind::OauthDenied,
        "USER_CANCELLED" => AuthErrorKind::OauthCancelled,
        "NETWORK_ERROR" => AuthErrorKind::NetworkError,
        "PROVIDER_ERROR" | "INVALID_AUTH_CODE" | "TOKEN_EXCHANGE_FAILED" => {
            AuthErrorKind::BackendError
        }
        _ => AuthErrorKind::BackendError,
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for failure classification; the wire behavior (retries,
    //! delays, payload shapes) is covered by the integration tests.
    use super::*;

    fn status_error(status: u16, code: Option<&str>) -> AttemptError {
        AttemptError::Status {
            status: StatusCode::from_u16(status).unwrap(),
            body: Some(CallbackErrorBody {
                code: code.map(str::to_string),
                message: Some("backend message".to_string()),
            }),
        }
    }

    /// Validates the retry predicate: 5xx retries, 4xx never.
    #[test]
    fn retry_predicate_by_status() {
        assert!(status_error(500, None).is_retryable());
        assert!(status_error(503, None).is_retryable());
        assert!(!status_error(400, None).is_retryable());
        assert!(!status_error(401, None).is_retryable());
        assert!(!status_error(404, None).is_retryable());
    }

    /// Validates the backend code table, including the unrecognized-code
    /// fallthrough preserving the raw code.
    #[test]
    fn backend_code_mapping() {
        let cases = [
            (Some("OAUTH_DENIED"), AuthErrorKind::OauthDenied),
            (Some("USER_CANCELLED"), AuthErrorKind::OauthCancelled),
            (Some("PROVIDER_ERROR"), AuthErrorKind::BackendError),
            (Some("NETWORK_ERROR"), AuthErrorKind::NetworkError),
            (Some("INVALID_AUTH_CODE"), AuthErrorKind::BackendError),
            (Some("TOKEN_EXCHANGE_FAILED"), AuthErrorKind::BackendError),
            (Some("SOMETHING_NEW"), AuthErrorKind::BackendError),
            (None, AuthErrorKind::BackendError),
        ];

        for (code, expected) in cases {
            let mapped = map_exchange_error(Provider::Kakao, status_error(400, code));
            assert_eq!(mapped.kind(), expected, "backend code {code:?}");
            let details = mapped.details().unwrap();
            assert_eq!(details["status"], 400);
            match code {
                Some(code) => assert_eq!(details["backendCode"], code),
                None => assert!(details["backendCode"].is_null()),
            }
        }
    }
}
