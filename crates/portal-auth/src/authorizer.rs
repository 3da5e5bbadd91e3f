//! Request authorizer.
//!
//! Wraps the transport and credentials every outbound call. Session requests
//! get the stored bearer token and provider header; a locally expired token
//! is refreshed before sending, and a 401 on a token that was not known to be
//! expired triggers one reactive refresh and a single retry. Any refresh
//! failure, or a rejection after the refresh, ends the session.
//!
//! API-key requests (the login call) never carry a bearer token.

use crate::http::{
    join_path, HttpRequest, HttpResponse, HttpTransport, RequestAuth, API_KEY_HEADER,
    AUTHORIZATION_HEADER, PROVIDER_HEADER,
};
use crate::{
    AuthError, AuthResult, LogoutCoordinator, LogoutReason, Navigator, Route, TokenRefresher,
};
use portal_storage::{CredentialStore, ProviderDescriptor, TokenBundle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// User-info endpoint, relative to the OIDC provider's redirect URI.
pub const USER_INFO_PATH: &str = "oidc/me";

/// Profile returned by an OIDC provider's user-info endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, alias = "preferred_username")]
    pub username: Option<String>,
    /// Any other claims
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

pub struct AuthorizedClient {
    store: Arc<CredentialStore>,
    transport: Arc<dyn HttpTransport>,
    refresher: Arc<TokenRefresher>,
    logout: Arc<LogoutCoordinator>,
    navigator: Arc<dyn Navigator>,
    api_base_url: Url,
    api_key: String,
}

impl AuthorizedClient {
    pub fn new(
        store: Arc<CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        refresher: Arc<TokenRefresher>,
        logout: Arc<LogoutCoordinator>,
        navigator: Arc<dyn Navigator>,
        api_base_url: Url,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            refresher,
            logout,
            navigator,
            api_base_url,
            api_key: api_key.into(),
        }
    }

    pub fn api_base_url(&self) -> &Url {
        &self.api_base_url
    }

    /// Resolve a backend path against the API base URL.
    pub fn endpoint(&self, path: &str) -> AuthResult<Url> {
        join_path(self.api_base_url.as_str(), path)
    }

    /// Send a request, credentialed according to its [`RequestAuth`].
    pub async fn send(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        match request.auth {
            RequestAuth::ApiKey => {
                let request = request.with_header(API_KEY_HEADER, self.api_key.as_str());
                self.transport.execute(request).await
            }
            RequestAuth::Session => self.send_with_session(request).await,
        }
    }

    async fn send_with_session(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let Some(session) = self.store.load()? else {
            debug!(url = %request.url, "No session, sending user to login");
            self.navigator.navigate(Route::Login);
            return Err(AuthError::NotLoggedIn);
        };
        let provider = session.provider;
        let mut bundle = session.bundle;
        let mut refreshed = false;

        if self.refresher.is_expired(&bundle) {
            debug!(url = %request.url, "Access token expired locally, refreshing first");
            bundle = self.refresh_or_logout(&bundle).await?;
            refreshed = true;
        }

        let response = self.dispatch(&request, &bundle, &provider).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        if refreshed {
            warn!(url = %request.url, "Request rejected with a freshly refreshed token");
            self.logout.logout(LogoutReason::Unauthorized).await;
            return Err(AuthError::Unauthorized);
        }

        info!(url = %request.url, "Request rejected, refreshing token");
        let bundle = self.refresh_or_logout(&bundle).await?;

        let retry = self.dispatch(&request, &bundle, &provider).await?;
        if retry.is_unauthorized() {
            warn!(url = %request.url, "Request rejected after refresh");
            self.logout.logout(LogoutReason::Unauthorized).await;
            return Err(AuthError::Unauthorized);
        }
        Ok(retry)
    }

    async fn refresh_or_logout(&self, stale: &TokenBundle) -> AuthResult<TokenBundle> {
        match self.refresher.refresh(&stale.access_token).await {
            Ok(bundle) => Ok(bundle),
            Err(AuthError::SessionEnded) => {
                // The logout that ended it already navigated
                debug!("Session ended while waiting for refresh");
                Err(AuthError::Unauthorized)
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed, ending session");
                self.logout.logout(LogoutReason::RefreshFailed).await;
                Err(AuthError::Unauthorized)
            }
        }
    }

    async fn dispatch(
        &self,
        request: &HttpRequest,
        bundle: &TokenBundle,
        provider: &ProviderDescriptor,
    ) -> AuthResult<HttpResponse> {
        let request = request
            .clone()
            .with_header(
                AUTHORIZATION_HEADER,
                format!("Bearer {}", bundle.access_token),
            )
            .with_header(PROVIDER_HEADER, provider.provider_key());
        self.transport.execute(request).await
    }

    /// Fetch the user profile from the OIDC provider.
    ///
    /// Returns `None` for local and SMS sessions.
    pub async fn fetch_user_profile(&self) -> AuthResult<Option<UserProfile>> {
        let Some(session) = self.store.load()? else {
            self.navigator.navigate(Route::Login);
            return Err(AuthError::NotLoggedIn);
        };
        let ProviderDescriptor::Oidc(provider) = &session.provider else {
            return Ok(None);
        };

        let url = join_path(&provider.redirect_uri, USER_INFO_PATH)?;
        let response = self.send(HttpRequest::get(url)).await?;
        if !response.is_success() {
            return Err(AuthError::Network(format!(
                "user-info request failed: HTTP {}",
                response.status
            )));
        }
        Ok(Some(response.json()?))
    }
}
