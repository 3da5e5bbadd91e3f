//! Logout coordinator: the single path that ends a session.
//!
//! Steps run in order and each is best-effort:
//! 1. remote session termination, when the provider supports it
//! 2. clearing the credential store
//! 3. navigation to the login entry point
//!
//! Concurrent calls are coalesced: while one logout is running, further
//! calls return immediately without navigating.

use crate::http::{join_path, HttpRequest, HttpTransport, AUTHORIZATION_HEADER};
use crate::{Navigator, Route};
use parking_lot::Mutex;
use portal_storage::{CredentialStore, StoredSession};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Remote logout endpoint, relative to the provider's redirect URI.
pub const REMOTE_LOGOUT_PATH: &str = "api/v2/logout";

/// Why the session is ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogoutReason {
    /// Explicit user action
    UserRequested,
    /// Idle supervisor expiry
    IdleTimeout,
    /// Token refresh failed
    RefreshFailed,
    /// Request rejected after the refresh attempt
    Unauthorized,
}

impl LogoutReason {
    /// First route shown after logout.
    pub fn route(&self) -> Route {
        match self {
            LogoutReason::IdleTimeout => Route::SessionExpired,
            _ => Route::Login,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// This call ran the logout
    Completed { had_session: bool },
    /// Another logout was already running
    Coalesced,
}

pub struct LogoutCoordinator {
    store: Arc<CredentialStore>,
    transport: Arc<dyn HttpTransport>,
    navigator: Arc<dyn Navigator>,
    expired_notice_delay: Duration,
    in_progress: AtomicBool,
    pending_redirect: Mutex<Option<JoinHandle<()>>>,
}

impl LogoutCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
        expired_notice_delay: Duration,
    ) -> Self {
        Self {
            store,
            transport,
            navigator,
            expired_notice_delay,
            in_progress: AtomicBool::new(false),
            pending_redirect: Mutex::new(None),
        }
    }

    /// End the session. Never fails; problems are logged and skipped.
    pub async fn logout(&self, reason: LogoutReason) -> LogoutOutcome {
        if self.in_progress.swap(true, Ordering::AcqRel) {
            debug!(reason = ?reason, "Logout already in progress");
            return LogoutOutcome::Coalesced;
        }
        let _guard = InProgressGuard(&self.in_progress);

        if let Some(redirect) = self.pending_redirect.lock().take() {
            redirect.abort();
        }

        let (session, unreadable) = match self.store.load() {
            Ok(session) => (session, false),
            Err(e) => {
                warn!(error = %e, "Could not read session before logout");
                (None, true)
            }
        };
        let had_session = session.is_some();

        if let Some(session) = &session {
            self.terminate_remote(session).await;
        }
        // An unreadable store may still hold credentials
        if had_session || unreadable {
            if let Err(e) = self.store.clear() {
                error!(error = %e, "Failed to clear credential store");
            }
        }

        info!(reason = ?reason, had_session, "Logged out");
        self.navigate_after(reason);

        LogoutOutcome::Completed { had_session }
    }

    fn navigate_after(&self, reason: LogoutReason) {
        let route = reason.route();
        self.navigator.navigate(route.clone());

        if route == Route::SessionExpired {
            let navigator = self.navigator.clone();
            let delay = self.expired_notice_delay;
            let redirect = tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                navigator.navigate(Route::Login);
            });
            *self.pending_redirect.lock() = Some(redirect);
        }
    }

    /// Best-effort remote session termination.
    async fn terminate_remote(&self, session: &StoredSession) {
        let provider = &session.provider;
        let Some(redirect_uri) = provider
            .redirect_uri()
            .filter(|_| provider.supports_remote_logout())
        else {
            return;
        };

        let url = match join_path(redirect_uri, REMOTE_LOGOUT_PATH) {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "Invalid remote logout URL");
                return;
            }
        };

        let request = HttpRequest::get(url).with_header(
            AUTHORIZATION_HEADER,
            format!("Bearer {}", session.bundle.access_token),
        );

        match self.transport.execute(request).await {
            Ok(response) if response.is_success() => {
                debug!(provider = %provider.provider_key(), "Remote session terminated");
            }
            Ok(response) => {
                warn!(
                    provider = %provider.provider_key(),
                    status = response.status,
                    "Remote logout rejected"
                );
            }
            Err(e) => {
                warn!(provider = %provider.provider_key(), error = %e, "Remote logout failed");
            }
        }
    }
}

/// Clears the in-progress flag even if the logout future is dropped.
struct InProgressGuard<'a>(&'a AtomicBool);

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Drop for LogoutCoordinator {
    fn drop(&mut self) {
        if let Some(redirect) = self.pending_redirect.get_mut().take() {
            redirect.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_routes() {
        assert_eq!(LogoutReason::IdleTimeout.route(), Route::SessionExpired);
        assert_eq!(LogoutReason::UserRequested.route(), Route::Login);
        assert_eq!(LogoutReason::RefreshFailed.route(), Route::Login);
        assert_eq!(LogoutReason::Unauthorized.route(), Route::Login);
    }
}
