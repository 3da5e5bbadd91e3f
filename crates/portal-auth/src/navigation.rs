//! Navigation surface driven by the session lifecycle.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the user is sent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Login entry point
    Login,
    /// Post-login landing page
    Landing,
    /// Idle/expired-session notice, redirects to login after a delay
    SessionExpired,
    /// Any other page, by URL
    Page(String),
}

impl Route {
    /// Whether the view requires a session.
    pub fn is_protected(&self) -> bool {
        !matches!(self, Route::Login | Route::SessionExpired)
    }

    pub fn path(&self) -> &str {
        match self {
            Route::Login => "/login",
            Route::Landing => "/",
            Route::SessionExpired => "/session-expired",
            Route::Page(url) => url,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Receives navigation requests.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protected_routes() {
        assert!(!Route::Login.is_protected());
        assert!(!Route::SessionExpired.is_protected());
        assert!(Route::Landing.is_protected());
        assert!(Route::Page("/library".to_string()).is_protected());
    }

    #[test]
    fn test_route_paths() {
        assert_eq!(Route::Login.to_string(), "/login");
        assert_eq!(Route::Page("/chat?id=4".to_string()).path(), "/chat?id=4");
    }
}
