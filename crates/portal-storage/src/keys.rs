//! Storage key constants.

/// Keys used in the origin store
pub struct StorageKeys;

impl StorageKeys {
    /// Serialized token bundle (JSON)
    pub const TOKEN_BUNDLE: &'static str = "portal.token_bundle";

    /// Serialized provider descriptor (JSON)
    pub const PROVIDER: &'static str = "portal.provider";

    /// Backend API base URL cached at startup
    pub const API_BASE_URL: &'static str = "portal.api_base_url";

    /// Page the user was on before being sent to login
    pub const LAST_VISITED_URL: &'static str = "portal.last_visited_url";

    /// Keys removed when a session ends.
    ///
    /// `LAST_VISITED_URL` outlives the session so the user can be returned
    /// to their page after signing in again.
    pub const SESSION_SCOPED: [&'static str; 3] =
        [Self::TOKEN_BUNDLE, Self::PROVIDER, Self::API_BASE_URL];
}
