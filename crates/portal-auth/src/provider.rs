//! OIDC providers offered on the login page.

use portal_config::OidcProviderConfig;
use portal_storage::OidcProvider;

/// Configured OIDC providers, looked up by display name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderRegistry {
    providers: Vec<OidcProvider>,
}

impl ProviderRegistry {
    pub fn new(providers: Vec<OidcProvider>) -> Self {
        Self { providers }
    }

    pub fn from_config(configs: &[OidcProviderConfig]) -> Self {
        Self::new(
            configs
                .iter()
                .map(|config| OidcProvider {
                    provider_name: config.name.clone(),
                    client_id: config.client_id.clone(),
                    redirect_uri: config.redirect_uri.clone(),
                    remote_logout: config.remote_logout,
                })
                .collect(),
        )
    }

    /// Find a provider by name, ignoring case and surrounding whitespace.
    pub fn find(&self, name: &str) -> Option<&OidcProvider> {
        let name = name.trim();
        self.providers
            .iter()
            .find(|p| p.provider_name.eq_ignore_ascii_case(name))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.iter().map(|p| p.provider_name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ProviderRegistry {
        ProviderRegistry::from_config(&[
            OidcProviderConfig {
                name: "Okta".to_string(),
                client_id: "okta-client".to_string(),
                redirect_uri: "https://tenant.okta.example".to_string(),
                remote_logout: true,
            },
            OidcProviderConfig {
                name: "Auth0".to_string(),
                client_id: "auth0-client".to_string(),
                redirect_uri: "https://tenant.auth0.example".to_string(),
                remote_logout: false,
            },
        ])
    }

    #[test]
    fn test_find_ignores_case() {
        let registry = registry();
        let okta = registry.find(" okta ").unwrap();
        assert_eq!(okta.provider_name, "Okta");
        assert_eq!(okta.client_id, "okta-client");
        assert!(registry.find("google").is_none());
    }

    #[test]
    fn test_remote_logout_flag_carried_over() {
        let registry = registry();
        assert!(!registry.find("Auth0").unwrap().remote_logout);
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["Okta", "Auth0"]);
    }
}
