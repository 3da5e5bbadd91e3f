//! Token refresh protocol.
//!
//! At most one refresh runs at a time. Callers pass the access token they
//! found to be stale; whoever takes the lock first performs the network
//! call, and everyone queued behind it sees the outcome instead of
//! refreshing again:
//!
//! - the stored token has already changed: the new bundle is returned
//! - the refresh for that token already failed: the same failure is returned
//!
//! The renewed bundle is written with a generation check, so a refresh that
//! completes after the session was cleared is discarded and reported as
//! [`AuthError::SessionEnded`].

use crate::http::{
    join_path, HttpRequest, HttpTransport, RequestAuth, API_KEY_HEADER, PROVIDER_HEADER,
};
use crate::token::{error_description, TokenPayload};
use crate::{AuthError, AuthResult, Clock};
use portal_storage::{CredentialStore, StoredSession, TokenBundle};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

/// Refresh endpoint, relative to the API base URL.
pub const REFRESH_PATH: &str = "auth/token/refresh";

#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    provider: String,
    client_id: &'a str,
    refresh_token: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

/// Outcome of the last failed refresh, shared with callers that queued
/// behind it.
#[derive(Default)]
struct RefreshState {
    failed_for: Option<(String, String)>,
}

pub struct TokenRefresher {
    store: Arc<CredentialStore>,
    transport: Arc<dyn HttpTransport>,
    clock: Arc<dyn Clock>,
    endpoint: Url,
    api_key: String,
    leeway: chrono::Duration,
    state: Mutex<RefreshState>,
}

impl TokenRefresher {
    pub fn new(
        store: Arc<CredentialStore>,
        transport: Arc<dyn HttpTransport>,
        clock: Arc<dyn Clock>,
        api_base_url: &Url,
        api_key: impl Into<String>,
        leeway: std::time::Duration,
    ) -> AuthResult<Self> {
        Ok(Self {
            store,
            transport,
            clock,
            endpoint: join_path(api_base_url.as_str(), REFRESH_PATH)?,
            api_key: api_key.into(),
            leeway: chrono::Duration::from_std(leeway)
                .unwrap_or_else(|_| chrono::Duration::zero()),
            state: Mutex::new(RefreshState::default()),
        })
    }

    /// Whether the bundle should be refreshed before it is used.
    pub fn is_expired(&self, bundle: &TokenBundle) -> bool {
        bundle.is_expired_at(self.clock.now(), self.leeway)
    }

    /// Renew the session whose access token `stale_access_token` was found
    /// expired or rejected. Returns the bundle to use from now on.
    pub async fn refresh(&self, stale_access_token: &str) -> AuthResult<TokenBundle> {
        let mut state = self.state.lock().await;

        let Some(session) = self.store.load()? else {
            debug!("Session ended before refresh");
            return Err(AuthError::SessionEnded);
        };

        // Any rotation since the caller read the store is the result to use,
        // even when the new token is itself inside the leeway window
        if session.bundle.access_token != stale_access_token {
            debug!("Token already refreshed by a concurrent caller");
            return Ok(session.bundle);
        }

        if let Some((token, message)) = &state.failed_for {
            if token == stale_access_token {
                debug!("Refresh for this token already failed");
                return Err(AuthError::Refresh(message.clone()));
            }
        }

        match self.exchange(&session).await {
            Ok(bundle) => {
                state.failed_for = None;
                if !self.store.replace_bundle_if(session.generation, &bundle)? {
                    warn!("Session ended while refreshing, discarding new token");
                    return Err(AuthError::SessionEnded);
                }
                info!(
                    provider = %session.provider.provider_key(),
                    expires_at = ?bundle.expires_at,
                    "Access token refreshed"
                );
                Ok(bundle)
            }
            Err(e) => {
                let message = match &e {
                    AuthError::Refresh(message) => message.clone(),
                    other => other.to_string(),
                };
                warn!(
                    provider = %session.provider.provider_key(),
                    error = %message,
                    "Token refresh failed"
                );
                state.failed_for = Some((stale_access_token.to_string(), message.clone()));
                Err(AuthError::Refresh(message))
            }
        }
    }

    /// Call the refresh endpoint. Writes nothing.
    async fn exchange(&self, session: &StoredSession) -> AuthResult<TokenBundle> {
        let provider = &session.provider;
        let body = RefreshRequest {
            provider: provider.provider_key(),
            client_id: provider.client_id(),
            refresh_token: &session.bundle.refresh_token,
            redirect_uri: provider.redirect_uri(),
        };

        let request = HttpRequest::post(self.endpoint.clone(), serde_json::to_value(&body)?)
            .with_auth(RequestAuth::ApiKey)
            .with_header(API_KEY_HEADER, self.api_key.as_str())
            .with_header(PROVIDER_HEADER, provider.provider_key());

        let response = self.transport.execute(request).await?;
        let body = response.json_value();

        if !response.is_success() {
            let detail = error_description(&body)
                .unwrap_or_else(|| format!("HTTP {}", response.status));
            return Err(AuthError::Refresh(detail));
        }

        let mut bundle = TokenPayload::from_response(&body)
            .and_then(|payload| {
                payload.into_bundle(self.clock.now(), Some(&session.bundle.refresh_token))
            })
            .ok_or_else(|| AuthError::Refresh("malformed refresh response".to_string()))?;
        if bundle.id_token.is_none() {
            bundle.id_token = session.bundle.id_token.clone();
        }
        Ok(bundle)
    }
}
