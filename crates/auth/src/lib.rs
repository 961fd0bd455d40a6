//! Rewear authentication and session lifecycle.
//!
//! This crate mediates OAuth-based social sign-in, exchanges and refreshes
//! backend-issued credential pairs, and exposes one consistent session
//! state to the rest of the application.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────┐
//! │ SocialLoginService  │  Sign-in orchestrator
//! └─────────┬───────────┘
//!           │
//!           ├──► providers           (registry + authorization URLs)
//!           ├──► flow::redirect      (external browser + app-link callback)
//!           ├──► flow::native        (provider SDK hand-off + fallback)
//!           └──► TokenExchangeClient (code/id-token → token pair, retried)
//!
//! ┌─────────────────────┐
//! │    SessionStore     │  Single-writer session state machine
//! └─────────┬───────────┘
//!           │
//!           ├──► TokenStorage        (keychain-backed refresh token)
//!           └──► SessionRefresher    (POST /auth/refresh)
//!
//! ┌─────────────────────┐
//! │      ApiClient      │  Bearer attach + one-shot refresh/replay
//! └─────────────────────┘
//! ```
//!
//! # Concurrency
//!
//! Everything runs on the async runtime with no shared-memory locking
//! beyond the store's state channel. The redirect flow settles exactly once
//! per attempt; hydrate and refresh are each single-flighted process-wide
//! but independent of each other.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use rewear_auth::exchange::TokenExchangeClient;
//! use rewear_auth::flow::{AppLinkBus, SystemLauncher};
//! use rewear_auth::refresh::RefreshTokenClient;
//! use rewear_auth::service::SocialLoginService;
//! use rewear_auth::session::SessionStore;
//! use rewear_auth::storage::KeychainTokenStorage;
//!
//! # async fn example() -> rewear_domain::Result<()> {
//! const API_BASE_URL: &str = "https://api.rewear.example";
//!
//! let links = AppLinkBus::new();
//! let store = SessionStore::new(
//!     KeychainTokenStorage::new(),
//!     RefreshTokenClient::new(API_BASE_URL),
//! );
//!
//! // Cold start: rebuild the session from the stored refresh token.
//! store.hydrate().await;
//!
//! let login = SocialLoginService::new(
//!     TokenExchangeClient::new(API_BASE_URL),
//!     Arc::new(SystemLauncher),
//!     links.clone(),
//! );
//!
//! // Platform glue forwards incoming deep links into `links`.
//! let response = login.login("kakao").await?;
//! store.login_success(&response).await?;
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod exchange;
pub mod flow;
pub mod http;
pub mod providers;
pub mod refresh;
pub mod retry;
pub mod service;
pub mod session;
pub mod storage;

pub use exchange::TokenExchangeClient;
pub use flow::{AppLinkBus, LinkLauncher, NativeAuthSdk, SystemLauncher};
pub use http::{ApiClient, SessionHandle};
pub use refresh::{RefreshTokenClient, SessionRefresher, REFRESH_ENDPOINT};
pub use service::SocialLoginService;
pub use session::{SessionStore, SESSION_EXPIRED_MESSAGE};
pub use storage::{KeychainTokenStorage, MemoryTokenStorage, TokenStorage};
