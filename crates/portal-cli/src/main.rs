//! Portal session command-line interface.

mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use portal_auth::{AuthMethod, Method, Navigator, PortalSession, ReqwestTransport, Route};
use portal_config::{init_logging, Config, Paths};
use url::Url;

/// Portal session command-line interface.
#[derive(Parser)]
#[command(name = "portal-session")]
#[command(about = "Sign in to the portal and make authorized requests")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    log_level: String,

    /// Base directory for runtime files (config, origin stores, logs). Defaults to ~/.portal-session
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Origin whose credential store is used. Defaults to the API base URL's origin
    #[arg(long, global = true)]
    origin: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        #[arg(short, long, value_enum, default_value = "local")]
        method: MethodArg,
        /// OIDC provider name (implies --method oidc)
        #[arg(short, long)]
        provider: Option<String>,
        #[arg(short, long)]
        username: String,
        /// Password, or the one-time code for SMS
        #[arg(long, alias = "code", env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the stored session
    Status,
    /// Show the OIDC user profile
    Whoami,
    /// Send an authorized request to the backend
    Request {
        /// Path relative to the API base URL
        path: String,
        #[arg(short = 'X', long, value_enum, default_value = "get")]
        method: HttpMethodArg,
        /// JSON request body
        #[arg(short, long)]
        data: Option<String>,
    },
    /// Remember a page to return to after the next login
    Visit { url: String },
    /// Supervise a page for inactivity; each line on stdin counts as activity
    Watch { url: String },
    /// Sign out
    Logout,
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Local,
    Sms,
    Oidc,
}

impl From<MethodArg> for AuthMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Local => AuthMethod::Local,
            MethodArg::Sms => AuthMethod::Sms,
            MethodArg::Oidc => AuthMethod::Oidc,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum HttpMethodArg {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethodArg> for Method {
    fn from(method: HttpMethodArg) -> Self {
        match method {
            HttpMethodArg::Get => Method::Get,
            HttpMethodArg::Post => Method::Post,
            HttpMethodArg::Put => Method::Put,
            HttpMethodArg::Patch => Method::Patch,
            HttpMethodArg::Delete => Method::Delete,
        }
    }
}

/// Prints every route change to stderr.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, route: Route) {
        eprintln!("-> {}", route);
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let paths = match cli.base_dir {
        Some(base) => Paths::with_base_dir(base),
        None => Paths::new()?,
    };
    paths.ensure_dirs()?;
    init_logging(&cli.log_level, &paths);

    let config = Config::load(&paths)?;
    let origin = match cli.origin {
        Some(origin) => origin,
        None => Url::parse(&config.api_base_url)?.origin().ascii_serialization(),
    };
    let store = Arc::new(portal_storage::open_credential_store(
        &paths.origin_store_file(&origin),
    )?);
    tracing::debug!(origin = %origin, "Using origin store");

    let session = PortalSession::new(
        &config,
        store,
        Arc::new(ReqwestTransport::new()?),
        Arc::new(TerminalNavigator),
    )?;

    match cli.command {
        Commands::Login {
            method,
            provider,
            username,
            password,
        } => {
            commands::login(&session, method.into(), provider, username, password).await?;
        }
        Commands::Status => commands::status(&session)?,
        Commands::Whoami => commands::whoami(&session).await?,
        Commands::Request { path, method, data } => {
            commands::request(&session, method.into(), &path, data.as_deref()).await?;
        }
        Commands::Visit { url } => session.record_visit(&url)?,
        Commands::Watch { url } => {
            commands::watch(&session, url, config.expired_notice_delay()).await?;
        }
        Commands::Logout => commands::logout(&session).await,
    }

    Ok(())
}
