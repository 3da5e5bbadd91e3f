//! Configuration, file system paths and logging bootstrap for the portal session.

mod config;
mod error;
mod logging;
mod paths;

pub use config::{
    Config, OidcProviderConfig, DEFAULT_API_BASE_URL, DEFAULT_API_KEY, DEFAULT_CLIENT_ID,
    DEFAULT_EXPIRED_NOTICE_DELAY_SECS, DEFAULT_IDLE_TIMEOUT_SECS, DEFAULT_LOG_LEVEL,
    DEFAULT_REFRESH_LEEWAY_SECS,
};
pub use error::{CoreError, CoreResult};
pub use logging::{init_logging, init_logging_for_service};
pub use paths::Paths;
