//! # Observability
//!
//! Logging bootstrap shared by the portal session binaries.
//!
//! Binaries call [`init`] or [`init_with_config`] once at startup and use the
//! plain `tracing` macros everywhere else. When a log path is configured every
//! event is appended to it as one JSON object per line; otherwise events go
//! to stderr in the compact human format.
//!
//! ```rust,ignore
//! fn main() {
//!     observability::init_with_config(observability::LogConfig {
//!         service_name: "portal-session".into(),
//!         default_level: "debug".into(),
//!         log_path: Some("/tmp/portal.jsonl".into()),
//!         also_stderr: false,
//!     });
//!
//!     tracing::info!("service started");
//! }
//! ```

mod json_layer;
mod writer;

pub use json_layer::{JsonLayer, LogEntry};
pub use writer::{LogFileWriter, WriterFactory};

use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, included in every JSON line.
    pub service_name: String,

    /// Default level filter (e.g. "debug", "info").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// JSONL output file. `None` logs to stderr only.
    pub log_path: Option<PathBuf>,

    /// Also emit logs to stderr when writing to a file.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize logging with a service name and default settings.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize logging with custom configuration.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_with_config(config: LogConfig) {
    let filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level))
    };

    let Some(path) = config.log_path.as_deref() else {
        let _ = tracing_subscriber::registry()
            .with(filter())
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .try_init();
        return;
    };

    let writer = match LogFileWriter::new(path) {
        Ok(writer) => writer,
        Err(e) => {
            eprintln!(
                "observability: cannot open {}: {e}, logging to stderr",
                path.display()
            );
            let _ = tracing_subscriber::registry()
                .with(filter())
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .try_init();
            return;
        }
    };

    let json = JsonLayer::new(config.service_name.clone(), WriterFactory::new(writer));
    let stderr = config
        .also_stderr
        .then(|| fmt::layer().compact().with_writer(std::io::stderr));

    let _ = tracing_subscriber::registry()
        .with(filter())
        .with(json)
        .with(stderr)
        .try_init();
}
