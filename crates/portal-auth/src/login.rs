//! Login flow: method selection, validation and submission.
//!
//! The form tracks the selected [`AuthMethod`], the OIDC provider (if any)
//! and the entered username and secret. Switching method clears the error
//! but keeps what the user typed.

use crate::http::{HttpRequest, RequestAuth};
use crate::login_fsm::{LoginMachine, LoginMachineInput, LoginState};
use crate::token::{error_description, TokenPayload};
use crate::{
    AuthError, AuthResult, AuthorizedClient, Clock, Navigator, ProviderRegistry, Route,
    ValidationError,
};
use portal_storage::{CredentialStore, OidcProvider, ProviderDescriptor, TokenBundle};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Login endpoint, relative to the API base URL.
pub const LOGIN_PATH: &str = "login";

/// Shown when the backend gives no usable error description.
pub const GENERIC_LOGIN_ERROR: &str = "Unable to sign in. Please try again.";

/// Shown when the sign-in service cannot be reached.
pub const NETWORK_LOGIN_ERROR: &str = "Unable to reach the sign-in service.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Username and password
    #[default]
    Local,
    /// Username and one-time code
    Sms,
    /// Username and password at an OIDC provider
    Oidc,
}

impl AuthMethod {
    fn secret_required(&self) -> ValidationError {
        match self {
            AuthMethod::Sms => ValidationError::CodeRequired,
            AuthMethod::Local | AuthMethod::Oidc => ValidationError::PasswordRequired,
        }
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
    client_id: &'a str,
    provider: String,
    username: &'a str,
    password: &'a str,
}

/// Callback type for login state change notifications.
pub type LoginStateCallback = Box<dyn Fn(LoginState) + Send + Sync>;

pub struct LoginFlow {
    client: Arc<AuthorizedClient>,
    store: Arc<CredentialStore>,
    navigator: Arc<dyn Navigator>,
    clock: Arc<dyn Clock>,
    providers: ProviderRegistry,
    client_id: String,
    machine: LoginMachine,
    method: AuthMethod,
    provider: Option<OidcProvider>,
    username: String,
    secret: String,
    error: Option<String>,
    state_callback: Option<LoginStateCallback>,
}

impl LoginFlow {
    pub fn new(
        client: Arc<AuthorizedClient>,
        store: Arc<CredentialStore>,
        navigator: Arc<dyn Navigator>,
        clock: Arc<dyn Clock>,
        providers: ProviderRegistry,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            store,
            navigator,
            clock,
            providers,
            client_id: client_id.into(),
            machine: LoginMachine::new(),
            method: AuthMethod::default(),
            provider: None,
            username: String::new(),
            secret: String::new(),
            error: None,
            state_callback: None,
        }
    }

    /// Set a callback to be notified of every state change.
    pub fn set_state_callback(&mut self, callback: LoginStateCallback) {
        self.state_callback = Some(callback);
    }

    pub fn state(&self) -> LoginState {
        LoginState::from(self.machine.state())
    }

    pub fn method(&self) -> AuthMethod {
        self.method
    }

    pub fn selected_provider(&self) -> Option<&OidcProvider> {
        self.provider.as_ref()
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Error currently shown on the form.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Switch authentication method. Only allowed while idle.
    pub fn select_method(&mut self, method: AuthMethod) -> AuthResult<()> {
        self.ensure_idle("select a method")?;
        if method != self.method {
            debug!(from = ?self.method, to = ?method, "Login method changed");
        }
        self.method = method;
        self.error = None;
        Ok(())
    }

    /// Pick an OIDC provider by name; also switches to the OIDC method.
    pub fn select_provider(&mut self, name: &str) -> AuthResult<()> {
        self.ensure_idle("select a provider")?;
        let Some(provider) = self.providers.find(name).cloned() else {
            let err = ValidationError::UnknownProvider(name.trim().to_string());
            self.error = Some(err.to_string());
            return Err(err.into());
        };
        self.method = AuthMethod::Oidc;
        self.provider = Some(provider);
        self.error = None;
        Ok(())
    }

    pub fn set_username(&mut self, username: impl Into<String>) {
        self.username = username.into();
    }

    /// Password or one-time code, depending on the method.
    pub fn set_secret(&mut self, secret: impl Into<String>) {
        self.secret = secret.into();
    }

    /// Check required fields and resolve the provider for this attempt.
    pub fn validate(&self) -> Result<ProviderDescriptor, ValidationError> {
        let provider = match self.method {
            AuthMethod::Local => ProviderDescriptor::Local {
                client_id: self.client_id.clone(),
            },
            AuthMethod::Sms => ProviderDescriptor::Sms {
                client_id: self.client_id.clone(),
            },
            AuthMethod::Oidc => ProviderDescriptor::Oidc(
                self.provider
                    .clone()
                    .ok_or(ValidationError::ProviderRequired)?,
            ),
        };

        if self.username.trim().is_empty() {
            return Err(ValidationError::UsernameRequired);
        }
        if self.secret.is_empty() {
            return Err(self.method.secret_required());
        }
        Ok(provider)
    }

    /// Submit the form.
    ///
    /// On success the session is stored and the user is sent to the page
    /// they last visited, or the landing page. On failure the flow is back
    /// in `Idle` with [`LoginFlow::error`] set.
    pub async fn submit(&mut self) -> AuthResult<Route> {
        self.ensure_idle("submit")?;

        let provider = match self.validate() {
            Ok(provider) => provider,
            Err(e) => {
                debug!(error = %e, "Login form incomplete");
                self.error = Some(e.to_string());
                return Err(e.into());
            }
        };

        self.error = None;
        self.transition(&LoginMachineInput::Submit)?;

        let issued = match self.request_tokens(&provider).await {
            Ok(bundle) => self
                .store
                .save(&bundle, &provider)
                .map_err(AuthError::from),
            Err(e) => Err(e),
        };

        if let Err(e) = issued {
            warn!(provider = %provider.provider_key(), error = %e, "Login failed");
            self.error = Some(match &e {
                AuthError::Authentication(message) => message.clone(),
                AuthError::Network(_) => NETWORK_LOGIN_ERROR.to_string(),
                _ => GENERIC_LOGIN_ERROR.to_string(),
            });
            self.transition(&LoginMachineInput::Rejected)?;
            self.transition(&LoginMachineInput::Retry)?;
            return Err(e);
        }

        if let Err(e) = self
            .store
            .cache_api_base_url(self.client.api_base_url().as_str())
        {
            warn!(error = %e, "Failed to cache API base URL");
        }

        self.secret.clear();
        self.transition(&LoginMachineInput::Succeeded)?;
        info!(provider = %provider.provider_key(), "Logged in");

        let route = match self.store.take_last_visited() {
            Ok(Some(url)) => Route::Page(url),
            Ok(None) => Route::Landing,
            Err(e) => {
                warn!(error = %e, "Failed to read last visited page");
                Route::Landing
            }
        };
        self.navigator.navigate(route.clone());
        Ok(route)
    }

    /// Return an authenticated flow to `Idle` for the next login.
    pub fn reset(&mut self) -> AuthResult<()> {
        if self.state() == LoginState::Authenticated {
            self.transition(&LoginMachineInput::Reset)?;
        }
        self.error = None;
        Ok(())
    }

    async fn request_tokens(&self, provider: &ProviderDescriptor) -> AuthResult<TokenBundle> {
        let body = LoginRequest {
            redirect_uri: provider.redirect_uri(),
            client_id: provider.client_id(),
            provider: provider.provider_key(),
            username: self.username.trim(),
            password: &self.secret,
        };
        let request =
            HttpRequest::post(self.client.endpoint(LOGIN_PATH)?, serde_json::to_value(&body)?)
                .with_auth(RequestAuth::ApiKey);

        let response = self.client.send(request).await?;
        let body = response.json_value();

        if response.is_success() {
            if let Some(bundle) = TokenPayload::from_response(&body)
                .and_then(|payload| payload.into_bundle(self.clock.now(), None))
            {
                return Ok(bundle);
            }
        }

        Err(AuthError::Authentication(
            error_description(&body).unwrap_or_else(|| GENERIC_LOGIN_ERROR.to_string()),
        ))
    }

    fn ensure_idle(&self, action: &str) -> AuthResult<()> {
        match self.state() {
            LoginState::Idle => Ok(()),
            state => Err(AuthError::InvalidStateTransition(format!(
                "Cannot {} in state {:?}",
                action, state
            ))),
        }
    }

    /// Transition the FSM and notify the callback.
    fn transition(&mut self, input: &LoginMachineInput) -> AuthResult<LoginState> {
        let old_state = self.state();
        self.machine.consume(input).map_err(|_| {
            AuthError::InvalidStateTransition(format!(
                "Cannot apply {:?} in state {:?}",
                input, old_state
            ))
        })?;

        let new_state = self.state();
        debug!(old_state = ?old_state, new_state = ?new_state, "Login state transition");
        if let Some(callback) = &self.state_callback {
            callback(new_state);
        }
        Ok(new_state)
    }
}
