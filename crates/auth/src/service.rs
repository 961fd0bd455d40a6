//! Social login orchestration.
//!
//! Wires the provider registry, the external flows, and the token exchange
//! client into the single entry point UI code calls. The caller feeds the
//! returned [`LoginResponse`] into the session store.

use std::sync::Arc;

use rewear_domain::{AuthError, AuthErrorKind, LoginResponse, Result};
use tracing::{debug, info};

use crate::exchange::TokenExchangeClient;
use crate::flow::{
    acquire_identity_token, generate_login_state, start_redirect_flow, AppLinkBus, LinkLauncher,
    NativeAuthSdk, RedirectFlowRequest,
};
use crate::providers::{build_authorization_url, resolve_provider_config, ResolvedProviderConfig};

/// End-to-end social sign-in.
pub struct SocialLoginService {
    exchange: TokenExchangeClient,
    launcher: Arc<dyn LinkLauncher>,
    links: AppLinkBus,
    native_sdk: Option<Arc<dyn NativeAuthSdk>>,
}

impl SocialLoginService {
    /// Create a service over the given exchange client and platform seams.
    pub fn new(
        exchange: TokenExchangeClient,
        launcher: Arc<dyn LinkLauncher>,
        links: AppLinkBus,
    ) -> Self {
        Self { exchange, launcher, links, native_sdk: None }
    }

    /// Wire in a native provider SDK. Without one, every provider goes
    /// through the redirect flow.
    #[must_use]
    pub fn with_native_sdk(mut self, sdk: Arc<dyn NativeAuthSdk>) -> Self {
        self.native_sdk = Some(sdk);
        self
    }

    /// Sign in with the given provider id.
    ///
    /// # Errors
    /// Every failure is an [`AuthError`] from the taxonomy; no raw
    /// transport or SDK error escapes.
    pub async fn login(&self, provider_id: &str) -> Result<LoginResponse> {
        let config = resolve_provider_config(provider_id)?;
        self.login_resolved(&config).await
    }

    /// Sign in with an already-resolved provider config.
    pub async fn login_resolved(&self, config: &ResolvedProviderConfig) -> Result<LoginResponse> {
        // Prefer the native hand-off when the provider supports it and an
        // SDK is wired in; otherwise fall back to the redirect flow.
        if config.native_callback_path.is_some() {
            if let Some(sdk) = &self.native_sdk {
                return self.native_login(config, sdk.as_ref()).await;
            }
            debug!(provider = %config.provider, "no native sdk wired, using redirect flow");
        }

        self.authorization_code_login(config).await
    }

    async fn native_login(
        &self,
        config: &ResolvedProviderConfig,
        sdk: &dyn NativeAuthSdk,
    ) -> Result<LoginResponse> {
        info!(provider = %config.provider, "starting native sign-in");
        let id_token = acquire_identity_token(sdk, config.provider).await?;
        self.exchange.exchange_identity_token(config, &id_token).await
    }

    async fn authorization_code_login(
        &self,
        config: &ResolvedProviderConfig,
    ) -> Result<LoginResponse> {
        let Some(redirect_uri) = config.redirect_uri.clone() else {
            return Err(AuthError::new(
                AuthErrorKind::ConfigError,
                "redirect-based sign-in requires a configured redirect uri",
            )
            .with_provider(config.provider));
        };

        info!(provider = %config.provider, "starting redirect sign-in");
        let state = generate_login_state();
        let authorization_url = build_authorization_url(config, &state, &[])?;

        let authorization = start_redirect_flow(
            self.launcher.as_ref(),
            &self.links,
            RedirectFlowRequest {
                authorization_url,
                redirect_uri,
                state,
                provider: config.provider,
                timeout: None,
            },
        )
        .await?;

        self.exchange.exchange_authorization_code(config, &authorization).await
    }
}
