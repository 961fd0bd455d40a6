//! Provider registry: static per-provider definitions plus environment
//! resolution, and the authorization-request URL builder.
//!
//! Definitions are compile-time constants; the runtime pieces (client id,
//! redirect uri, scope overrides, native callback path) come from the
//! environment through [`EnvSource`]. An unimplemented provider never yields
//! a resolved config, and a config-required provider never resolves without
//! its client id and redirect uri.

use rewear_domain::{AuthError, AuthErrorKind, Provider, Result};
use serde_json::json;

use crate::env::{EnvSource, ProcessEnv};

/// Default backend path for the Kakao native id-token exchange.
pub const DEFAULT_KAKAO_NATIVE_CALLBACK_PATH: &str = "/auth/kakao/native";

/// Static description of a social provider.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefinition {
    pub provider: Provider,
    pub authorization_endpoint: &'static str,
    pub callback_path: &'static str,
    pub native_callback_path: Option<&'static str>,
    pub default_scopes: &'static [&'static str],
    pub response_type: &'static str,
    pub scope_separator: &'static str,
    pub implemented: bool,
    pub extra_authorize_params: &'static [(&'static str, &'static str)],
    pub requires_client_config: bool,
}

/// Environment key names carrying per-provider runtime configuration.
#[derive(Debug, Clone, Copy)]
struct ProviderEnvKeys {
    client_id: &'static str,
    redirect_uri: &'static str,
    scopes: &'static str,
    native_callback_path: Option<&'static str>,
}

const KAKAO: ProviderDefinition = ProviderDefinition {
    provider: Provider::Kakao,
    authorization_endpoint: "https://kauth.kakao.com/oauth/authorize",
    callback_path: DEFAULT_KAKAO_NATIVE_CALLBACK_PATH,
    native_callback_path: Some(DEFAULT_KAKAO_NATIVE_CALLBACK_PATH),
    default_scopes: &["openid", "profile_nickname", "account_email"],
    response_type: "code",
    scope_separator: " ",
    implemented: true,
    extra_authorize_params: &[("prompt", "login")],
    // The Kakao path normally goes through the native SDK, which carries its
    // own app credentials.
    requires_client_config: false,
};

const APPLE: ProviderDefinition = ProviderDefinition {
    provider: Provider::Apple,
    authorization_endpoint: "https://appleid.apple.com/auth/authorize",
    callback_path: "/auth/apple/callback",
    native_callback_path: None,
    default_scopes: &["name", "email"],
    response_type: "code",
    scope_separator: " ",
    implemented: false,
    extra_authorize_params: &[("response_mode", "form_post")],
    requires_client_config: true,
};

const GOOGLE: ProviderDefinition = ProviderDefinition {
    provider: Provider::Google,
    authorization_endpoint: "https://accounts.google.com/o/oauth2/v2/auth",
    callback_path: "/auth/google/callback",
    native_callback_path: None,
    default_scopes: &["profile", "email"],
    response_type: "code",
    scope_separator: " ",
    implemented: false,
    extra_authorize_params: &[
        ("access_type", "offline"),
        ("include_granted_scopes", "true"),
        ("prompt", "consent"),
    ],
    requires_client_config: true,
};

const KAKAO_ENV: ProviderEnvKeys = ProviderEnvKeys {
    client_id: "OAUTH_KAKAO_CLIENT_ID",
    redirect_uri: "OAUTH_KAKAO_REDIRECT_URI",
    scopes: "OAUTH_KAKAO_SCOPES",
    native_callback_path: Some("OAUTH_KAKAO_NATIVE_CALLBACK_PATH"),
};

const APPLE_ENV: ProviderEnvKeys = ProviderEnvKeys {
    client_id: "APPLE_CLIENT_ID",
    redirect_uri: "APPLE_REDIRECT_URI",
    scopes: "APPLE_AUTH_SCOPES",
    native_callback_path: None,
};

const GOOGLE_ENV: ProviderEnvKeys = ProviderEnvKeys {
    client_id: "GOOGLE_CLIENT_ID",
    redirect_uri: "GOOGLE_REDIRECT_URI",
    scopes: "GOOGLE_AUTH_SCOPES",
    native_callback_path: None,
};

/// Static definition for a known provider.
#[must_use]
pub fn definition(provider: Provider) -> &'static ProviderDefinition {
    match provider {
        Provider::Kakao => &KAKAO,
        Provider::Apple => &APPLE,
        Provider::Google => &GOOGLE,
    }
}

fn env_keys(provider: Provider) -> &'static ProviderEnvKeys {
    match provider {
        Provider::Kakao => &KAKAO_ENV,
        Provider::Apple => &APPLE_ENV,
        Provider::Google => &GOOGLE_ENV,
    }
}

/// Whether the given provider id has a usable sign-in implementation.
#[must_use]
pub fn is_provider_implemented(id: &str) -> bool {
    Provider::parse(id).map(|p| definition(p).implemented).unwrap_or(false)
}

/// Display name for a provider id, falling back to the raw id.
#[must_use]
pub fn provider_display_name(id: &str) -> String {
    Provider::parse(id)
        .map(|p| p.display_name().to_string())
        .unwrap_or_else(|| id.to_string())
}

/// Provider definition resolved against the runtime environment.
#[derive(Debug, Clone)]
pub struct ResolvedProviderConfig {
    pub provider: Provider,
    pub authorization_endpoint: String,
    pub callback_path: String,
    pub native_callback_path: Option<String>,
    pub response_type: String,
    pub scope_separator: String,
    pub extra_authorize_params: Vec<(String, String)>,
    pub client_id: Option<String>,
    pub redirect_uri: Option<String>,
    pub scopes: Vec<String>,
}

/// Resolve a provider id against the process environment.
///
/// # Errors
/// - `UNKNOWN` for unrecognized ids;
/// - `NOT_IMPLEMENTED` for providers without a sign-in implementation;
/// - `CONFIG_ERROR` (listing the missing keys) when a config-required
///   provider lacks its client id or redirect uri.
pub fn resolve_provider_config(id: &str) -> Result<ResolvedProviderConfig> {
    resolve_provider_config_with(id, &ProcessEnv)
}

/// Resolve a provider id against an injected environment source.
pub fn resolve_provider_config_with(
    id: &str,
    env: &dyn EnvSource,
) -> Result<ResolvedProviderConfig> {
    let provider = Provider::parse(id).ok_or_else(|| {
        AuthError::new(AuthErrorKind::Unknown, "unsupported login provider")
            .with_details(json!({ "provider": id }))
    })?;

    let definition = definition(provider);
    if !definition.implemented {
        return Err(AuthError::new(
            AuthErrorKind::NotImplemented,
            format!("{} login is not available yet", provider.display_name()),
        )
        .with_provider(provider));
    }

    resolve_definition(definition, env)
}

fn resolve_definition(
    definition: &ProviderDefinition,
    env: &dyn EnvSource,
) -> Result<ResolvedProviderConfig> {
    let provider = definition.provider;
    let keys = env_keys(provider);

    let client_id = env.get(keys.client_id);
    let redirect_uri = env.get(keys.redirect_uri);

    if definition.requires_client_config {
        let mut missing_keys = Vec::new();
        if client_id.is_none() {
            missing_keys.push(keys.client_id);
        }
        if redirect_uri.is_none() {
            missing_keys.push(keys.redirect_uri);
        }
        if !missing_keys.is_empty() {
            return Err(AuthError::new(
                AuthErrorKind::ConfigError,
                format!("{} login configuration is incomplete", provider.display_name()),
            )
            .with_provider(provider)
            .with_details(json!({ "missingKeys": missing_keys })));
        }
    }

    let scopes = match env.get(keys.scopes) {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|scope| !scope.is_empty())
            .map(str::to_string)
            .collect(),
        None => definition.default_scopes.iter().map(|s| (*s).to_string()).collect(),
    };

    let native_callback_path = keys
        .native_callback_path
        .and_then(|key| env.get(key))
        .or_else(|| definition.native_callback_path.map(str::to_string));

    Ok(ResolvedProviderConfig {
        provider,
        authorization_endpoint: definition.authorization_endpoint.to_string(),
        callback_path: definition.callback_path.to_string(),
        native_callback_path,
        response_type: definition.response_type.to_string(),
        scope_separator: definition.scope_separator.to_string(),
        extra_authorize_params: definition
            .extra_authorize_params
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect(),
        client_id,
        redirect_uri,
        scopes,
    })
}

/// Build the external authorization-request URL for a resolved provider.
///
/// Serializes `client_id`, `redirect_uri`, `response_type`, the joined
/// scopes, `state`, then the static extra params, then `extras` (later wins
/// on key collision). Keys and values are percent-encoded; empty-string
/// extras are dropped.
///
/// # Errors
/// Returns `CONFIG_ERROR` when the resolved config lacks a client id or
/// redirect uri.
pub fn build_authorization_url(
    config: &ResolvedProviderConfig,
    state: &str,
    extras: &[(&str, &str)],
) -> Result<String> {
    let (Some(client_id), Some(redirect_uri)) = (&config.client_id, &config.redirect_uri) else {
        return Err(AuthError::new(
            AuthErrorKind::ConfigError,
            format!(
                "{} login configuration is incomplete",
                config.provider.display_name()
            ),
        )
        .with_provider(config.provider));
    };

    let mut params: Vec<(String, String)> = Vec::new();
    upsert(&mut params, "client_id", client_id);
    upsert(&mut params, "redirect_uri", redirect_uri);
    upsert(&mut params, "response_type", &config.response_type);
    if !config.scopes.is_empty() {
        upsert(&mut params, "scope", &config.scopes.join(&config.scope_separator));
    }
    upsert(&mut params, "state", state);

    for (key, value) in &config.extra_authorize_params {
        if !value.is_empty() {
            upsert(&mut params, key, value);
        }
    }
    for (key, value) in extras {
        if !value.is_empty() {
            upsert(&mut params, key, value);
        }
    }

    let query = params
        .iter()
        .map(|(key, value)| {
            format!("{}={}", urlencoding::encode(key), urlencoding::encode(value))
        })
        .collect::<Vec<_>>()
        .join("&");

    Ok(format!("{}?{}", config.authorization_endpoint, query))
}

/// Insert or replace a query parameter, preserving first-insertion order.
fn upsert(params: &mut Vec<(String, String)>, key: &str, value: &str) {
    if let Some(entry) = params.iter_mut().find(|(k, _)| k == key) {
        entry.1 = value.to_string();
    } else {
        params.push((key.to_string(), value.to_string()));
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for provider resolution and URL building.
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| ((*k).to_string(), (*v).to_string())).collect()
    }

    fn resolved_kakao(env_pairs: &[(&str, &str)]) -> ResolvedProviderConfig {
        resolve_provider_config_with("kakao", &env(env_pairs)).unwrap()
    }

    /// Validates that Kakao resolves without client config and keeps its
    /// static defaults.
    #[test]
    fn kakao_resolves_without_client_config() {
        let config = resolved_kakao(&[]);

        assert_eq!(config.provider, Provider::Kakao);
        assert_eq!(config.client_id, None);
        assert_eq!(config.scopes, vec!["openid", "profile_nickname", "account_email"]);
        assert_eq!(
            config.native_callback_path.as_deref(),
            Some(DEFAULT_KAKAO_NATIVE_CALLBACK_PATH)
        );
    }

    /// Validates unimplemented providers always fail `NOT_IMPLEMENTED`,
    /// never `CONFIG_ERROR` or `UNKNOWN`, even with no environment at all.
    #[test]
    fn unimplemented_providers_fail_not_implemented() {
        for id in ["apple", "google"] {
            let error = resolve_provider_config_with(id, &env(&[])).unwrap_err();
            assert_eq!(error.kind(), AuthErrorKind::NotImplemented, "provider {id}");
        }
    }

    /// Validates unrecognized ids fail `UNKNOWN`.
    #[test]
    fn unrecognized_id_fails_unknown() {
        let error = resolve_provider_config_with("naver", &env(&[])).unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::Unknown);
        assert_eq!(
            error.details().and_then(|d| d["provider"].as_str()),
            Some("naver")
        );
    }

    /// Validates a config-required provider missing exactly one key fails
    /// `CONFIG_ERROR` listing exactly that key.
    #[test]
    fn missing_single_key_is_listed() {
        let mut required = KAKAO;
        required.requires_client_config = true;

        let error = resolve_definition(
            &required,
            &env(&[("OAUTH_KAKAO_CLIENT_ID", "client-123")]),
        )
        .unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::ConfigError);
        let missing = error.details().map(|d| d["missingKeys"].clone()).unwrap();
        assert_eq!(missing, serde_json::json!(["OAUTH_KAKAO_REDIRECT_URI"]));

        let error =
            resolve_definition(&required, &env(&[("OAUTH_KAKAO_REDIRECT_URI", "app://cb")]))
                .unwrap_err();
        let missing = error.details().map(|d| d["missingKeys"].clone()).unwrap();
        assert_eq!(missing, serde_json::json!(["OAUTH_KAKAO_CLIENT_ID"]));
    }

    /// Validates scope overrides are comma-split, trimmed, and empties
    /// dropped.
    #[test]
    fn scope_override_parsing() {
        let config = resolved_kakao(&[("OAUTH_KAKAO_SCOPES", " openid , ,profile_nickname,")]);
        assert_eq!(config.scopes, vec!["openid", "profile_nickname"]);
    }

    /// Validates the native callback path env override wins over the static
    /// default.
    #[test]
    fn native_callback_path_override() {
        let config = resolved_kakao(&[("OAUTH_KAKAO_NATIVE_CALLBACK_PATH", "/auth/kakao/v2")]);
        assert_eq!(config.native_callback_path.as_deref(), Some("/auth/kakao/v2"));
    }

    /// Validates `build_authorization_url` determinism, ordering, encoding,
    /// and extras precedence.
    #[test]
    fn authorization_url_building() {
        let config = resolved_kakao(&[
            ("OAUTH_KAKAO_CLIENT_ID", "client 123"),
            ("OAUTH_KAKAO_REDIRECT_URI", "app://auth/callback"),
        ]);

        let url = build_authorization_url(&config, "STATE1", &[]).unwrap();
        assert!(url.starts_with("https://kauth.kakao.com/oauth/authorize?client_id=client%20123"));
        assert!(url.contains("redirect_uri=app%3A%2F%2Fauth%2Fcallback"));
        assert!(url.contains("response_type=code"));
        assert!(url.contains("scope=openid%20profile_nickname%20account_email"));
        assert!(url.contains("state=STATE1"));
        assert!(url.contains("prompt=login"));

        // Deterministic for identical inputs.
        assert_eq!(url, build_authorization_url(&config, "STATE1", &[]).unwrap());

        // Caller extras win over static extras on collision; empty values
        // are dropped.
        let url = build_authorization_url(
            &config,
            "STATE1",
            &[("prompt", "consent"), ("nonce", ""), ("audience", "api")],
        )
        .unwrap();
        assert!(url.contains("prompt=consent"));
        assert!(!url.contains("prompt=login"));
        assert!(!url.contains("nonce"));
        assert!(url.contains("audience=api"));
    }

    /// Validates the builder fails `CONFIG_ERROR` without client id or
    /// redirect uri.
    #[test]
    fn authorization_url_requires_client_config() {
        let config = resolved_kakao(&[]);
        let error = build_authorization_url(&config, "STATE1", &[]).unwrap_err();
        assert_eq!(error.kind(), AuthErrorKind::ConfigError);
    }

    /// Validates the id helpers used by UI code.
    #[test]
    fn id_helpers() {
        assert!(is_provider_implemented("kakao"));
        assert!(!is_provider_implemented("apple"));
        assert!(!is_provider_implemented("naver"));
        assert_eq!(provider_display_name("apple"), "Apple ID");
        assert_eq!(provider_display_name("naver"), "naver");
    }
}
