//! Core domain types for the Rewear session subsystem.
//!
//! This crate is intentionally dependency-light: it defines the error
//! taxonomy, the canonical data model shared by every other component, and
//! the user-facing message mapping. Anything that touches the network, the
//! platform keychain, or the async runtime lives in `rewear-auth`.

pub mod errors;
pub mod messages;
pub mod types;

pub use errors::{AuthError, AuthErrorKind, Result};
pub use types::{
    AuthorizationResult, LoginResponse, Provider, SessionState, SessionStatus, TokenPair, UserStub,
};
