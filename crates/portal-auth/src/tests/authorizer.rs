//! Request authorizer scenarios.

use super::harness::*;
use crate::{
    AuthError, HttpRequest, RequestAuth, Route, API_KEY_HEADER, PROVIDER_HEADER, USER_INFO_PATH,
};
use serde_json::json;

fn documents_ok() -> Reply {
    Reply::json(200, json!({"documents": []}))
}

#[tokio::test]
async fn test_no_session_navigates_to_login_without_sending() {
    let h = TestHarness::new();

    let result = h.session.client().send(h.get("documents")).await;

    assert!(matches!(result, Err(AuthError::NotLoggedIn)));
    assert!(h.transport.requests().is_empty());
    assert_eq!(h.navigator.routes(), vec![Route::Login]);
}

#[tokio::test]
async fn test_attaches_bearer_and_provider_headers() {
    let h = TestHarness::new();
    h.seed_valid("AT1", okta_descriptor());
    h.transport.reply("/documents", documents_ok());

    let response = h.session.client().send(h.get("documents")).await.unwrap();

    assert_eq!(response.status, 200);
    let sent = &h.transport.requests_to("/documents")[0];
    assert_eq!(sent.bearer_token(), Some("AT1"));
    assert_eq!(sent.header(PROVIDER_HEADER), Some("okta"));
    assert!(sent.header(API_KEY_HEADER).is_none());
}

#[tokio::test]
async fn test_api_key_request_never_carries_bearer() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    h.transport.reply("/status", Reply::status(200));

    let request = h.get("status").with_auth(RequestAuth::ApiKey);
    h.session.client().send(request).await.unwrap();

    let sent = &h.transport.requests_to("/status")[0];
    assert_eq!(sent.header(API_KEY_HEADER), Some(API_KEY));
    assert!(sent.bearer_token().is_none());
}

#[tokio::test]
async fn test_expired_token_is_refreshed_before_sending() {
    let h = TestHarness::new();
    h.seed_expired("AT1", local_descriptor());
    h.transport.reply(
        "/auth/token/refresh",
        Reply::json(200, json!({"access_token": "AT2", "expires_in": 3600})),
    );
    h.transport.handle("/documents", |request| {
        if request.bearer_token() == Some("AT2") {
            documents_ok()
        } else {
            Reply::status(401)
        }
    });

    let response = h.session.client().send(h.get("documents")).await.unwrap();

    assert_eq!(response.status, 200);
    let sent = h.transport.requests_to("/documents");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].bearer_token(), Some("AT2"));
    assert_eq!(h.stored_access_token().as_deref(), Some("AT2"));
    // Refresh token was not rotated
    assert_eq!(h.store.load().unwrap().unwrap().bundle.refresh_token, "RT1");
}

#[tokio::test]
async fn test_token_inside_leeway_counts_as_expired() {
    let h = TestHarness::new();
    h.seed("AT1", local_descriptor(), chrono::Duration::seconds(10));
    h.transport.reply(
        "/auth/token/refresh",
        Reply::json(200, json!({"access_token": "AT2", "expires_in": 3600})),
    );
    h.transport.reply("/documents", documents_ok());

    h.session.client().send(h.get("documents")).await.unwrap();

    assert_eq!(h.transport.count("/auth/token/refresh"), 1);
    assert_eq!(h.transport.requests_to("/documents")[0].bearer_token(), Some("AT2"));
}

#[tokio::test]
async fn test_refresh_failure_logs_out_and_aborts_request() {
    let h = TestHarness::new();
    h.seed_expired("AT1", local_descriptor());
    h.transport.reply("/auth/token/refresh", Reply::status(400));

    let result = h.session.client().send(h.get("documents")).await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    assert!(h.store.load().unwrap().is_none());
    assert_eq!(h.navigator.last(), Some(Route::Login));
    assert_eq!(h.transport.count("/documents"), 0);
}

#[tokio::test]
async fn test_rejected_request_triggers_reactive_refresh_and_retry() {
    let h = TestHarness::new();
    h.seed_valid("AT1", okta_descriptor());
    h.transport.reply(
        "/auth/token/refresh",
        Reply::json(200, json!({"access_token": "AT2", "refresh_token": "RT2"})),
    );
    h.transport.handle("/documents", |request| match request.bearer_token() {
        Some("AT2") => documents_ok(),
        _ => Reply::status(401),
    });

    let response = h.session.client().send(h.get("documents")).await.unwrap();

    assert_eq!(response.status, 200);
    let sent = h.transport.requests_to("/documents");
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].bearer_token(), Some("AT1"));
    assert_eq!(sent[1].bearer_token(), Some("AT2"));

    let session = h.store.load().unwrap().unwrap();
    assert_eq!(session.bundle.access_token, "AT2");
    assert_eq!(session.bundle.refresh_token, "RT2");
}

#[tokio::test]
async fn test_rejection_after_refresh_logs_out() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    h.transport.reply(
        "/auth/token/refresh",
        Reply::json(200, json!({"access_token": "AT2"})),
    );
    h.transport.reply("/documents", Reply::status(401));

    let result = h.session.client().send(h.get("documents")).await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    assert_eq!(h.transport.count("/auth/token/refresh"), 1);
    assert_eq!(h.transport.count("/documents"), 2);
    assert!(h.store.load().unwrap().is_none());
    assert_eq!(h.navigator.last(), Some(Route::Login));
}

#[tokio::test]
async fn test_proactively_refreshed_token_is_not_refreshed_again() {
    let h = TestHarness::new();
    h.seed_expired("AT1", local_descriptor());
    h.transport.reply(
        "/auth/token/refresh",
        Reply::json(200, json!({"access_token": "AT2", "expires_in": 3600})),
    );
    h.transport.reply("/documents", Reply::status(401));

    let result = h.session.client().send(h.get("documents")).await;

    assert!(matches!(result, Err(AuthError::Unauthorized)));
    assert_eq!(h.transport.count("/auth/token/refresh"), 1);
    assert_eq!(h.transport.count("/documents"), 1);
    assert!(h.store.load().unwrap().is_none());
}

#[tokio::test]
async fn test_network_error_is_not_retried() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    h.transport
        .reply("/documents", Reply::Fail("connection reset".to_string()));

    let result = h.session.client().send(h.get("documents")).await;

    assert!(matches!(result, Err(AuthError::Network(_))));
    assert_eq!(h.transport.count("/documents"), 1);
    assert_eq!(h.transport.count("/auth/token/refresh"), 0);
    assert!(h.store.load().unwrap().is_some());
}

#[tokio::test]
async fn test_non_auth_failures_are_returned_as_is() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    h.transport.reply("/documents", Reply::status(503));

    let response = h.session.client().send(h.get("documents")).await.unwrap();

    assert_eq!(response.status, 503);
    assert!(h.store.load().unwrap().is_some());
}

#[tokio::test]
async fn test_fetch_user_profile_for_oidc_session() {
    let h = TestHarness::new();
    h.seed_valid("AT1", okta_descriptor());
    h.transport.reply(
        &format!("/{USER_INFO_PATH}"),
        Reply::json(200, json!({"sub": "00u1", "email": "alice@example.com"})),
    );

    let profile = h.session.client().fetch_user_profile().await.unwrap().unwrap();

    assert_eq!(profile.email.as_deref(), Some("alice@example.com"));
    let sent = &h.transport.requests_to("/oidc/me")[0];
    assert_eq!(sent.url.host_str(), Some("tenant.okta.test"));
    assert_eq!(sent.bearer_token(), Some("AT1"));
}

#[tokio::test]
async fn test_fetch_user_profile_for_local_session_is_none() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());

    let profile = h.session.client().fetch_user_profile().await.unwrap();

    assert!(profile.is_none());
    assert!(h.transport.requests().is_empty());
}

#[tokio::test]
async fn test_request_body_and_method_are_preserved() {
    let h = TestHarness::new();
    h.seed_valid("AT1", local_descriptor());
    h.transport.reply("/documents", Reply::status(201));

    let request = HttpRequest::post(h.api("documents"), json!({"name": "report.pdf"}));
    h.session.client().send(request).await.unwrap();

    let sent = &h.transport.requests_to("/documents")[0];
    assert_eq!(sent.method, crate::Method::Post);
    assert_eq!(sent.body, Some(json!({"name": "report.pdf"})));
}
