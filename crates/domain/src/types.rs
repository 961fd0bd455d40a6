//! Canonical data model shared across the session subsystem.
//!
//! Wire-facing structs use camelCase field names to match the backend
//! surface (`accessToken`, `refreshToken`, `isNewUser`, ...).

use serde::{Deserialize, Serialize};

/// Social sign-in providers known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Kakao,
    Apple,
    Google,
}

impl Provider {
    /// Parse a provider id as it appears in deep links and UI payloads.
    ///
    /// Returns `None` for unrecognized ids; the provider registry maps that
    /// case to an `UNKNOWN` error.
    #[must_use]
    pub fn parse(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().as_str() {
            "kakao" => Some(Self::Kakao),
            "apple" => Some(Self::Apple),
            "google" => Some(Self::Google),
            _ => None,
        }
    }

    /// Stable lowercase id used on the wire and in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kakao => "kakao",
            Self::Apple => "apple",
            Self::Google => "google",
        }
    }

    /// Human-readable name substituted into user-facing messages.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Kakao => "Kakao",
            Self::Apple => "Apple ID",
            Self::Google => "Google",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backend-issued credential pair.
///
/// The access token lives only in memory; the refresh token is the sole
/// value handed to secure storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_expires_in: Option<i64>,
}

/// Minimal user identity attached to a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStub {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nickname: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Outcome of a completed social sign-in, as returned by the backend
/// callback endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub provider: Provider,
    pub tokens: TokenPair,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_new_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserStub>,
}

/// Authorization code captured from the redirect callback.
///
/// Produced by the redirect flow controller and consumed immediately by the
/// token exchange client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorizationResult {
    pub code: String,
    pub state: Option<String>,
}

/// Lifecycle states of the client session.
///
/// `Idle` is the cold-start state before the first hydrate; every operation
/// terminates in `Authenticated` or `Unauthenticated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Idle,
    Hydrating,
    Authenticated,
    Unauthenticated,
}

/// Snapshot of the session owned by the session store.
///
/// Mutated only through the store's operations; consumers read it via
/// snapshots or the watch subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub access_token: Option<String>,
    pub user: Option<UserStub>,
    pub status: SessionStatus,
    pub is_hydrated: bool,
    pub last_error: Option<String>,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            access_token: None,
            user: None,
            status: SessionStatus::Idle,
            is_hydrated: false,
            last_error: None,
        }
    }
}

impl SessionState {
    /// Whether the session currently holds a usable bearer credential.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated && self.access_token.is_some()
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the shared data model.
    use super::*;

    /// Validates `Provider::parse` behavior for known and unknown ids.
    ///
    /// Assertions:
    /// - Confirms known ids parse case-insensitively.
    /// - Ensures unrecognized ids yield `None`.
    #[test]
    fn provider_parse_known_and_unknown() {
        assert_eq!(Provider::parse("kakao"), Some(Provider::Kakao));
        assert_eq!(Provider::parse(" Apple "), Some(Provider::Apple));
        assert_eq!(Provider::parse("GOOGLE"), Some(Provider::Google));
        assert_eq!(Provider::parse("naver"), None);
        assert_eq!(Provider::parse(""), None);
    }

    /// Validates camelCase wire naming on `TokenPair`.
    ///
    /// Assertions:
    /// - Confirms serialized keys are `accessToken`/`refreshToken`.
    /// - Ensures absent optionals are omitted.
    #[test]
    fn token_pair_wire_format() {
        let pair = TokenPair {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            expires_in: Some(3600),
            refresh_expires_in: None,
        };

        let value = serde_json::to_value(&pair).unwrap();
        assert_eq!(value["accessToken"], "a");
        assert_eq!(value["refreshToken"], "r");
        assert_eq!(value["expiresIn"], 3600);
        assert!(value.get("refreshExpiresIn").is_none());
    }

    /// Validates `LoginResponse` deserialization from a backend payload.
    #[test]
    fn login_response_from_backend_payload() {
        let response: LoginResponse = serde_json::from_value(serde_json::json!({
            "provider": "kakao",
            "tokens": {"accessToken": "a", "refreshToken": "r"},
            "isNewUser": true,
            "user": {"id": "u-1", "nickname": "nick"},
        }))
        .unwrap();

        assert_eq!(response.provider, Provider::Kakao);
        assert_eq!(response.is_new_user, Some(true));
        assert_eq!(response.user.as_ref().map(|u| u.id.as_str()), Some("u-1"));
    }

    /// Validates the default session state and `is_authenticated`.
    #[test]
    fn session_state_defaults() {
        let state = SessionState::default();
        assert_eq!(state.status, SessionStatus::Idle);
        assert!(!state.is_hydrated);
        assert!(!state.is_authenticated());

        let authenticated = SessionState {
            access_token: Some("token".to_string()),
            status: SessionStatus::Authenticated,
            ..SessionState::default()
        };
        assert!(authenticated.is_authenticated());
    }
}
