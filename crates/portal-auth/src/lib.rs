//! Session and credential lifecycle for the sign-in portal.
//!
//! This crate provides:
//! - Login flow across local, SMS and OIDC methods (FSM-based)
//! - Request authorization with bearer tokens and provider routing
//! - Single-flight token refresh, proactive and on 401
//! - Idle supervision that ends dormant sessions
//! - One idempotent logout path for every reason a session ends

mod authorizer;
mod clock;
mod error;
mod http;
mod idle;
mod login;
mod login_fsm;
mod logout;
mod navigation;
mod provider;
mod refresh;
mod session;
mod token;

#[cfg(test)]
mod tests;

pub use authorizer::{AuthorizedClient, UserProfile, USER_INFO_PATH};
pub use clock::{Clock, SystemClock};
pub use error::{AuthError, AuthResult, ValidationError};
pub use http::{
    HttpRequest, HttpResponse, HttpTransport, Method, RequestAuth, ReqwestTransport,
    API_KEY_HEADER, AUTHORIZATION_HEADER, PROVIDER_HEADER, STATUS_UNAUTHORIZED,
};
pub use idle::{ActivityEvent, ActivityHandle, IdleSupervisor, IdleTimer};
pub use login::{
    AuthMethod, LoginFlow, LoginStateCallback, GENERIC_LOGIN_ERROR, LOGIN_PATH,
    NETWORK_LOGIN_ERROR,
};
pub use login_fsm::login_machine;
pub use login_fsm::{LoginMachine, LoginMachineInput, LoginMachineState, LoginState};
pub use logout::{LogoutCoordinator, LogoutOutcome, LogoutReason, REMOTE_LOGOUT_PATH};
pub use navigation::{Navigator, Route};
pub use provider::ProviderRegistry;
pub use refresh::{TokenRefresher, REFRESH_PATH};
pub use session::{PortalSession, SessionStatus};
pub use token::jwt_expiry;
