//! Logging initialization.
//!
//! Every entry point installs the shared observability subscriber, which
//! writes structured JSONL to `~/.portal-session/logs/portal.jsonl`.

use observability::LogConfig;

use crate::Paths;

/// Initialize logging for the portal session.
///
/// `RUST_LOG` takes precedence over `level` when set.
///
/// # Example
///
/// ```ignore
/// init_logging("info", &paths);
/// tracing::info!("portal session ready");
/// ```
pub fn init_logging(level: &str, paths: &Paths) {
    init_logging_for_service("portal-session", level, paths);
}

/// Initialize logging with a custom service name.
pub fn init_logging_for_service(service_name: &str, level: &str, paths: &Paths) {
    observability::init_with_config(LogConfig {
        service_name: service_name.into(),
        default_level: level.into(),
        log_path: Some(paths.log_file()),
        also_stderr: std::env::var("PORTAL_LOG_STDERR")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
    });
}
