//! Subcommand implementations.

use std::time::Duration;

use portal_auth::{
    ActivityEvent, AuthMethod, HttpRequest, LogoutOutcome, Method, PortalSession, Route,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const WATCH_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub async fn login(
    session: &PortalSession,
    method: AuthMethod,
    provider: Option<String>,
    username: String,
    password: String,
) -> CliResult<()> {
    let mut flow = session.login_flow();
    match provider {
        Some(name) => flow.select_provider(&name)?,
        None => flow.select_method(method)?,
    }
    flow.set_username(username);
    flow.set_secret(password);

    match flow.submit().await {
        Ok(route) => {
            println!("Logged in, continuing to {}", route);
            Ok(())
        }
        // The form error is the message meant for the user
        Err(e) => Err(flow
            .error()
            .map(str::to_string)
            .unwrap_or_else(|| e.to_string())
            .into()),
    }
}

pub fn status(session: &PortalSession) -> CliResult<()> {
    let status = session.status()?;
    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(())
}

pub async fn whoami(session: &PortalSession) -> CliResult<()> {
    match session.client().fetch_user_profile().await? {
        Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
        None => println!("No user profile for this sign-in method"),
    }
    Ok(())
}

pub async fn request(
    session: &PortalSession,
    method: Method,
    path: &str,
    data: Option<&str>,
) -> CliResult<()> {
    let client = session.client();
    let mut request = HttpRequest::new(method, client.endpoint(path)?);
    if let Some(data) = data {
        request = request.with_body(serde_json::from_str(data)?);
    }

    let response = client.send(request).await?;
    eprintln!("HTTP {}", response.status);
    println!("{}", response.body);

    if !response.is_success() {
        return Err(format!("request failed with HTTP {}", response.status).into());
    }
    Ok(())
}

/// Supervise `url` until the session ends or the user interrupts.
pub async fn watch(session: &PortalSession, url: String, notice_delay: Duration) -> CliResult<()> {
    if !session.status()?.authenticated {
        return Err("not logged in".into());
    }

    let Some(supervisor) = session.enter_view(&Route::Page(url)) else {
        return Ok(());
    };
    let activity = supervisor.activity_handle();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut poll = tokio::time::interval(WATCH_POLL_INTERVAL);

    loop {
        tokio::select! {
            line = lines.next_line(), if stdin_open => match line? {
                Some(_) => activity.record(ActivityEvent::KeyPress),
                None => stdin_open = false,
            },
            _ = poll.tick() => {
                if !supervisor.is_active() && !session.status()?.authenticated {
                    info!("Session ended after inactivity");
                    // Let the expired notice redirect before exiting
                    tokio::time::sleep(notice_delay + WATCH_POLL_INTERVAL).await;
                    return Ok(());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                supervisor.stop();
                return Ok(());
            }
        }
    }
}

pub async fn logout(session: &PortalSession) {
    match session.logout().await {
        LogoutOutcome::Completed { had_session: true } => println!("Logged out"),
        LogoutOutcome::Completed { had_session: false } => println!("No active session"),
        LogoutOutcome::Coalesced => println!("Logout already in progress"),
    }
}
