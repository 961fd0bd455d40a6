//! External authorization flows.
//!
//! Two paths produce a credential the backend can exchange: the redirect
//! flow (external browser + app-link callback) and the native SDK flow
//! (in-app provider hand-off with an account-login fallback). Both settle
//! exactly once and fail only with taxonomy errors.

pub mod launcher;
pub mod links;
pub mod native;
pub mod redirect;

pub use launcher::{LaunchError, LinkLauncher, SystemLauncher};
pub use links::AppLinkBus;
pub use native::{acquire_identity_token, NativeAuthSdk, NativeSdkError, NativeTokenPayload};
pub use redirect::{
    generate_login_state, start_redirect_flow, RedirectFlowRequest, DEFAULT_REDIRECT_TIMEOUT,
};
