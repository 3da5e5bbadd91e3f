//! Portal session runtime.
//!
//! Wires the credential store, authorizer, refresher, logout coordinator and
//! login flow together from one [`Config`], so entry points share a single
//! authority for login, requests, status and logout.

use crate::{
    AuthResult, AuthorizedClient, Clock, HttpTransport, IdleSupervisor, LoginFlow,
    LogoutCoordinator, LogoutOutcome, LogoutReason, Navigator, ProviderRegistry, Route,
    SystemClock, TokenRefresher,
};
use chrono::{DateTime, Utc};
use portal_config::Config;
use portal_storage::CredentialStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Snapshot of the session for status reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Expired or within the refresh leeway
    pub locally_expired: bool,
}

#[derive(Clone)]
pub struct PortalSession {
    store: Arc<CredentialStore>,
    client: Arc<AuthorizedClient>,
    refresher: Arc<TokenRefresher>,
    logout: Arc<LogoutCoordinator>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    providers: ProviderRegistry,
    client_id: String,
    idle_timeout: Duration,
}

impl PortalSession {
    pub fn new(
        config: &Config,
        store: Arc<CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
    ) -> AuthResult<Self> {
        Self::with_clock(config, store, transport, navigator, Arc::new(SystemClock))
    }

    pub fn with_clock(
        config: &Config,
        store: Arc<CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        config.validate()?;
        let api_base_url = config.api_base_url()?;

        let refresher = Arc::new(TokenRefresher::new(
            store.clone(),
            transport.clone(),
            clock.clone(),
            &api_base_url,
            config.api_key.clone(),
            config.refresh_leeway(),
        )?);
        let logout = Arc::new(LogoutCoordinator::new(
            store.clone(),
            transport.clone(),
            navigator.clone(),
            config.expired_notice_delay(),
        ));
        let client = Arc::new(AuthorizedClient::new(
            store.clone(),
            transport,
            refresher.clone(),
            logout.clone(),
            navigator.clone(),
            api_base_url,
            config.api_key.clone(),
        ));

        Ok(Self {
            store,
            client,
            refresher,
            logout,
            navigator,
            clock,
            providers: ProviderRegistry::from_config(&config.oidc_providers),
            client_id: config.client_id.clone(),
            idle_timeout: config.idle_timeout(),
        })
    }

    /// A fresh login form.
    pub fn login_flow(&self) -> LoginFlow {
        LoginFlow::new(
            self.client.clone(),
            self.store.clone(),
            self.navigator.clone(),
            self.clock.clone(),
            self.providers.clone(),
            self.client_id.clone(),
        )
    }

    /// Client for authenticated backend calls.
    pub fn client(&self) -> Arc<AuthorizedClient> {
        self.client.clone()
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Explicit user logout.
    pub async fn logout(&self) -> LogoutOutcome {
        self.logout.logout(LogoutReason::UserRequested).await
    }

    /// Enter a view: protected pages are remembered for post-login return
    /// and get an idle supervisor; the login page gets neither.
    pub fn enter_view(&self, route: &Route) -> Option<IdleSupervisor> {
        if let Route::Page(url) = route {
            if let Err(e) = self.record_visit(url) {
                warn!(error = %e, "Failed to remember visited page");
            }
        }
        IdleSupervisor::start(route, self.idle_timeout, self.logout.clone())
    }

    /// Remember the page the user is on.
    pub fn record_visit(&self, url: &str) -> AuthResult<()> {
        debug!(url, "Recording visited page");
        Ok(self.store.set_last_visited(url)?)
    }

    pub fn status(&self) -> AuthResult<SessionStatus> {
        let status = match self.store.load()? {
            Some(session) => SessionStatus {
                authenticated: true,
                provider: Some(session.provider.provider_key()),
                expires_at: session.bundle.expires_at,
                locally_expired: self.refresher.is_expired(&session.bundle),
            },
            None => SessionStatus {
                authenticated: false,
                provider: None,
                expires_at: None,
                locally_expired: false,
            },
        };
        Ok(status)
    }
}
