//! Idle supervisor scenarios, run against a paused tokio clock.

use super::harness::*;
use crate::{ActivityEvent, AuthError, Route};
use serde_json::json;
use std::time::Duration;

const THRESHOLD: Duration = Duration::from_secs(60);

async fn advance(by: Duration) {
    tokio::time::advance(by).await;
    settle().await;
}

#[tokio::test(start_paused = true)]
async fn test_idle_logout_fires_at_threshold_and_not_before() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    let supervisor = h.session.enter_view(&Route::Landing).unwrap();

    advance(THRESHOLD - Duration::from_millis(1)).await;
    assert!(h.store.load().unwrap().is_some());
    assert!(supervisor.is_active());

    advance(Duration::from_millis(1)).await;
    assert!(h.store.load().unwrap().is_none());
    assert_eq!(h.navigator.last(), Some(Route::SessionExpired));
    assert!(!supervisor.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_activity_resets_the_deadline() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    let supervisor = h.session.enter_view(&Route::Landing).unwrap();

    advance(Duration::from_secs(45)).await;
    supervisor.record(ActivityEvent::KeyPress);
    settle().await;

    // Original deadline passes without a logout
    advance(Duration::from_secs(30)).await;
    assert!(h.store.load().unwrap().is_some());

    // New deadline is 45s + 60s from the start
    advance(Duration::from_secs(29)).await;
    assert!(h.store.load().unwrap().is_some());
    advance(Duration::from_secs(1)).await;
    assert!(h.store.load().unwrap().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_every_activity_kind_resets() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    let supervisor = h.session.enter_view(&Route::Landing).unwrap();
    let handle = supervisor.activity_handle();

    for event in [
        ActivityEvent::PointerMove,
        ActivityEvent::Click,
        ActivityEvent::KeyPress,
        ActivityEvent::Scroll,
        ActivityEvent::PageLoad,
    ] {
        advance(Duration::from_secs(50)).await;
        handle.record(event);
        settle().await;
    }

    assert!(h.store.load().unwrap().is_some());
    assert!(supervisor.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_expired_notice_redirects_to_login_after_delay() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    let _supervisor = h.session.enter_view(&Route::Landing).unwrap();

    advance(THRESHOLD).await;
    assert_eq!(h.navigator.routes(), vec![Route::SessionExpired]);

    advance(Duration::from_secs(4)).await;
    assert_eq!(h.navigator.routes(), vec![Route::SessionExpired]);

    advance(Duration::from_secs(1)).await;
    assert_eq!(
        h.navigator.routes(),
        vec![Route::SessionExpired, Route::Login]
    );
}

#[tokio::test(start_paused = true)]
async fn test_supervisor_disabled_on_login_page() {
    let h = TestHarness::new();

    assert!(h.session.enter_view(&Route::Login).is_none());
    assert!(h.session.enter_view(&Route::SessionExpired).is_none());
}

#[tokio::test(start_paused = true)]
async fn test_dropped_supervisor_never_fires() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());

    let supervisor = h.session.enter_view(&Route::Landing).unwrap();
    supervisor.stop();

    advance(THRESHOLD * 2).await;
    assert!(h.store.load().unwrap().is_some());
    assert!(h.navigator.routes().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_entering_a_page_remembers_it() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());

    let _supervisor = h
        .session
        .enter_view(&Route::Page("/library".to_string()))
        .unwrap();

    assert_eq!(h.store.last_visited().unwrap().as_deref(), Some("/library"));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_landing_after_idle_logout_keeps_the_notice() {
    let h = TestHarness::new();
    h.seed_expired("AT1", local_descriptor());
    h.transport.reply(
        "/auth/token/refresh",
        Reply::json(200, json!({"access_token": "AT2", "expires_in": 3600}))
            .delayed(Duration::from_secs(62)),
    );
    let _supervisor = h.session.enter_view(&Route::Landing).unwrap();

    let client = h.session.client();
    let request = h.get("documents");
    let pending = tokio::spawn(async move { client.send(request).await });
    settle().await;

    advance(THRESHOLD).await;
    assert_eq!(h.navigator.routes(), vec![Route::SessionExpired]);

    // Refresh completes mid-notice and is discarded without a second logout
    advance(Duration::from_secs(2)).await;
    assert!(pending.is_finished());
    assert!(matches!(pending.await.unwrap(), Err(AuthError::Unauthorized)));
    assert!(h.store.load().unwrap().is_none());
    assert_eq!(h.navigator.routes(), vec![Route::SessionExpired]);

    advance(Duration::from_secs(3)).await;
    assert_eq!(
        h.navigator.routes(),
        vec![Route::SessionExpired, Route::Login]
    );
}
