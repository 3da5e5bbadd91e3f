//! Credential material persisted for an active session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokens issued for the current session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBundle {
    /// Bearer token attached to backend calls
    pub access_token: String,
    /// Token exchanged for a new access token
    pub refresh_token: String,
    /// OIDC ID token, when the provider issues one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    /// When the access token expires, if known locally
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenBundle {
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            id_token: None,
            expires_at: None,
        }
    }

    pub fn with_id_token(mut self, id_token: impl Into<String>) -> Self {
        self.id_token = Some(id_token.into());
        self
    }

    pub fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    /// Whether the access token is expired at `now`, counting tokens that
    /// expire within `leeway` as already expired.
    ///
    /// A bundle without a known expiry is never locally expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>, leeway: Duration) -> bool {
        self.expires_at
            .map_or(false, |expires_at| expires_at <= now + leeway)
    }
}

impl fmt::Debug for TokenBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenBundle")
            .field("access_token", &format_args!("<{} bytes>", self.access_token.len()))
            .field("refresh_token", &format_args!("<{} bytes>", self.refresh_token.len()))
            .field("id_token", &self.id_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Metadata for an OpenID-Connect provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OidcProvider {
    /// Display name, e.g. "Okta"
    pub provider_name: String,
    pub client_id: String,
    /// Provider base URL; user-info and logout endpoints hang off it
    pub redirect_uri: String,
    /// Whether the provider exposes a remote logout endpoint
    #[serde(default = "default_remote_logout")]
    pub remote_logout: bool,
}

fn default_remote_logout() -> bool {
    true
}

/// Identity backend that issued the current session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderDescriptor {
    /// Local username/password accounts
    Local {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    /// SMS one-time codes
    Sms {
        #[serde(rename = "clientId")]
        client_id: String,
    },
    /// Third-party OpenID-Connect issuer
    Oidc(OidcProvider),
}

impl ProviderDescriptor {
    /// Key sent to the backend to route token introspection.
    pub fn provider_key(&self) -> String {
        match self {
            ProviderDescriptor::Local { .. } => "local".to_string(),
            ProviderDescriptor::Sms { .. } => "sms".to_string(),
            ProviderDescriptor::Oidc(provider) => provider.provider_name.to_lowercase(),
        }
    }

    pub fn client_id(&self) -> &str {
        match self {
            ProviderDescriptor::Local { client_id } | ProviderDescriptor::Sms { client_id } => {
                client_id
            }
            ProviderDescriptor::Oidc(provider) => &provider.client_id,
        }
    }

    pub fn redirect_uri(&self) -> Option<&str> {
        match self {
            ProviderDescriptor::Local { .. } | ProviderDescriptor::Sms { .. } => None,
            ProviderDescriptor::Oidc(provider) => Some(&provider.redirect_uri),
        }
    }

    /// Whether logging out should also end the session at the provider.
    pub fn supports_remote_logout(&self) -> bool {
        match self {
            ProviderDescriptor::Local { .. } | ProviderDescriptor::Sms { .. } => false,
            ProviderDescriptor::Oidc(provider) => provider.remote_logout,
        }
    }
}
