//! Configuration management for the portal session.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default backend URL (can be overridden at compile time via PORTAL_API_BASE_URL env var).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("PORTAL_API_BASE_URL") {
    Some(url) => url,
    None => "https://api.example.com",
};

/// Default login API key (can be overridden at compile time via PORTAL_API_KEY env var).
pub const DEFAULT_API_KEY: &str = match option_env!("PORTAL_API_KEY") {
    Some(key) => key,
    None => "public-api-key",
};

/// Default application client id for local and SMS logins.
pub const DEFAULT_CLIENT_ID: &str = "portal-web";

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Fifteen minutes of inactivity ends the session.
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 15 * 60;

/// How long the expired-session notice is shown before redirecting to login.
pub const DEFAULT_EXPIRED_NOTICE_DELAY_SECS: u64 = 5;

/// Tokens this close to expiry are refreshed before use.
pub const DEFAULT_REFRESH_LEEWAY_SECS: u64 = 30;

/// An OpenID-Connect provider offered on the login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OidcProviderConfig {
    /// Display name ("Okta", "Auth0", ...)
    pub name: String,
    pub client_id: String,
    /// Provider base URL
    pub redirect_uri: String,
    /// Whether the provider supports remote session termination
    #[serde(default = "default_true")]
    pub remote_logout: bool,
}

fn default_true() -> bool {
    true
}

/// Main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Backend endpoint prefix.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Fixed application credential attached to the login call.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Application client id for local and SMS logins.
    #[serde(default = "default_client_id")]
    pub client_id: String,
    /// Inactivity threshold for protected views.
    #[serde(default = "default_idle_timeout_secs")]
    pub idle_timeout_secs: u64,
    /// Delay before the expired-session notice redirects to login.
    #[serde(default = "default_expired_notice_delay_secs")]
    pub expired_notice_delay_secs: u64,
    /// Expiry window treated as already expired.
    #[serde(default = "default_refresh_leeway_secs")]
    pub refresh_leeway_secs: u64,
    /// OIDC providers available for login.
    #[serde(default)]
    pub oidc_providers: Vec<OidcProviderConfig>,
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_api_key() -> String {
    DEFAULT_API_KEY.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_idle_timeout_secs() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_expired_notice_delay_secs() -> u64 {
    DEFAULT_EXPIRED_NOTICE_DELAY_SECS
}

fn default_refresh_leeway_secs() -> u64 {
    DEFAULT_REFRESH_LEEWAY_SECS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            api_base_url: default_api_base_url(),
            api_key: default_api_key(),
            client_id: default_client_id(),
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            expired_notice_delay_secs: DEFAULT_EXPIRED_NOTICE_DELAY_SECS,
            refresh_leeway_secs: DEFAULT_REFRESH_LEEWAY_SECS,
            oidc_providers: Vec::new(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file, falling back to defaults,
    /// then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    /// Override configuration from environment variables.
    fn load_from_env(&mut self) {
        if let Some(log_level) = env_override("PORTAL_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Some(url) = env_override("PORTAL_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(key) = env_override("PORTAL_API_KEY") {
            self.api_key = key;
        }
    }

    /// Check values that would otherwise fail on first use.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;

        if self.idle_timeout_secs == 0 {
            return Err(CoreError::Config(
                "idle_timeout_secs must be greater than zero".to_string(),
            ));
        }

        for provider in &self.oidc_providers {
            Url::parse(&provider.redirect_uri)?;
            let duplicates = self
                .oidc_providers
                .iter()
                .filter(|p| p.name.eq_ignore_ascii_case(&provider.name))
                .count();
            if duplicates > 1 {
                return Err(CoreError::Config(format!(
                    "OIDC provider '{}' is configured more than once",
                    provider.name
                )));
            }
        }

        Ok(())
    }

    /// Get the backend base URL as a parsed URL.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    /// Look up an OIDC provider by name, ignoring case.
    pub fn oidc_provider(&self, name: &str) -> Option<&OidcProviderConfig> {
        self.oidc_providers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    pub fn expired_notice_delay(&self) -> Duration {
        Duration::from_secs(self.expired_notice_delay_secs)
    }

    pub fn refresh_leeway(&self) -> Duration {
        Duration::from_secs(self.refresh_leeway_secs)
    }
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
