//! Idle supervisor.
//!
//! One countdown per protected view. Activity pushes the deadline out to
//! `now + threshold`; reaching the deadline logs out. The countdown runs on
//! `tokio::time`, so tests drive it with a paused clock.

use crate::{LogoutCoordinator, LogoutReason, Route};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace};

const ACTIVITY_BUFFER: usize = 64;

/// User activity that resets the countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityEvent {
    PointerMove,
    Click,
    KeyPress,
    Scroll,
    PageLoad,
}

/// Deadline bookkeeping, free of any runtime.
#[derive(Debug, Clone, Copy)]
pub struct IdleTimer {
    threshold: Duration,
    deadline: Instant,
}

impl IdleTimer {
    pub fn start(threshold: Duration, now: Instant) -> Self {
        Self {
            threshold,
            deadline: now + threshold,
        }
    }

    pub fn record_activity(&mut self, now: Instant) {
        self.deadline = now + self.threshold;
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// Cheap handle for activity sources to report events.
#[derive(Debug, Clone)]
pub struct ActivityHandle {
    sender: mpsc::Sender<ActivityEvent>,
}

impl ActivityHandle {
    pub fn record(&self, event: ActivityEvent) {
        // A full buffer already holds a pending reset
        let _ = self.sender.try_send(event);
    }
}

/// Countdown for one protected view. Dropping it cancels the countdown.
pub struct IdleSupervisor {
    activity: ActivityHandle,
    task: JoinHandle<()>,
}

impl IdleSupervisor {
    /// Start supervising `route`. Returns `None` for views that need no
    /// session, such as the login page.
    pub fn start(
        route: &Route,
        threshold: Duration,
        logout: Arc<LogoutCoordinator>,
    ) -> Option<Self> {
        if !route.is_protected() {
            debug!(route = %route, "Idle supervisor disabled for this view");
            return None;
        }

        let (sender, receiver) = mpsc::channel(ACTIVITY_BUFFER);
        let timer = IdleTimer::start(threshold, Instant::now());
        let task = tokio::spawn(run(timer, receiver, logout));

        debug!(route = %route, threshold_secs = threshold.as_secs(), "Idle supervisor started");
        Some(Self {
            activity: ActivityHandle { sender },
            task,
        })
    }

    pub fn activity_handle(&self) -> ActivityHandle {
        self.activity.clone()
    }

    pub fn record(&self, event: ActivityEvent) {
        self.activity.record(event);
    }

    /// Whether the countdown is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Cancel the countdown when the view is torn down.
    pub fn stop(self) {
        self.task.abort();
        debug!("Idle supervisor stopped");
    }
}

impl Drop for IdleSupervisor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(
    mut timer: IdleTimer,
    mut activity: mpsc::Receiver<ActivityEvent>,
    logout: Arc<LogoutCoordinator>,
) {
    loop {
        tokio::select! {
            event = activity.recv() => match event {
                Some(event) => {
                    trace!(event = ?event, "Activity");
                    timer.record_activity(Instant::now());
                }
                None => {
                    debug!("Activity source closed, idle supervisor stopping");
                    return;
                }
            },
            _ = tokio::time::sleep_until(timer.deadline()) => {
                info!(
                    idle_secs = timer.threshold().as_secs(),
                    "Idle threshold reached, logging out"
                );
                // Detached so tearing down the view cannot interrupt the logout
                tokio::spawn(async move {
                    logout.logout(LogoutReason::IdleTimeout).await;
                });
                return;
            }
        }
    }
}
