//! HTTP client abstraction.
//!
//! Every outbound call is described by an [`HttpRequest`] and executed by an
//! [`HttpTransport`]. The request's [`RequestAuth`] tells the authorizer how
//! to credential it, so the login exception is a property of the request
//! rather than a URL check.

use crate::{AuthError, AuthResult};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;
use url::Url;

pub const AUTHORIZATION_HEADER: &str = "Authorization";
/// Routes token introspection to the issuing backend.
pub const PROVIDER_HEADER: &str = "X-Auth-Provider";
/// Application-level credential for unauthenticated calls.
pub const API_KEY_HEADER: &str = "X-Api-Key";

/// Authorization-rejection status.
pub const STATUS_UNAUTHORIZED: u16 = 401;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

/// How a request is credentialed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestAuth {
    /// Bearer token and provider header from the stored session
    Session,
    /// Fixed application API key, never a bearer token
    ApiKey,
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub auth: RequestAuth,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: Vec::new(),
            body: None,
            auth: RequestAuth::Session,
        }
    }

    pub fn get(url: Url) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn post(url: Url, body: serde_json::Value) -> Self {
        Self::new(Method::Post, url).with_body(body)
    }

    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_auth(mut self, auth: RequestAuth) -> Self {
        self.auth = auth;
        self
    }

    /// Set a header, replacing any existing value (names compare case-insensitively).
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.into()));
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Bearer token carried by this request, if any.
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION_HEADER)
            .and_then(|value| value.strip_prefix("Bearer "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == STATUS_UNAUTHORIZED
    }

    pub fn json<T: DeserializeOwned>(&self) -> AuthResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }

    /// Body as JSON, or `Null` when it is empty or not JSON.
    pub fn json_value(&self) -> serde_json::Value {
        serde_json::from_str(&self.body).unwrap_or(serde_json::Value::Null)
    }
}

/// Executes requests exactly as given.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute(&self, request: HttpRequest) -> AuthResult<HttpResponse>;
}

/// Production transport backed by reqwest.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> AuthResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> AuthResult<HttpResponse> {
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        };

        debug!(method = %method, url = %request.url, "Sending request");

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        debug!(status, url = %request.url, "Received response");
        Ok(HttpResponse { status, body })
    }
}

/// Join `path` onto a provider base URL that may or may not end in `/`.
pub(crate) fn join_path(base: &str, path: &str) -> AuthResult<Url> {
    let url = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Ok(Url::parse(&url)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url() -> Url {
        Url::parse("https://api.example.com/documents").unwrap()
    }

    #[test]
    fn test_request_defaults_to_session_auth() {
        let request = HttpRequest::get(url());
        assert_eq!(request.auth, RequestAuth::Session);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let request = HttpRequest::get(url())
            .with_header("authorization", "Bearer OLD")
            .with_header(AUTHORIZATION_HEADER, "Bearer NEW");

        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("AUTHORIZATION"), Some("Bearer NEW"));
        assert_eq!(request.bearer_token(), Some("NEW"));
    }

    #[test]
    fn test_response_status_helpers() {
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(401, "").is_success());
        assert!(HttpResponse::new(401, "").is_unauthorized());
        assert_eq!(HttpResponse::new(500, "oops").json_value(), serde_json::Value::Null);
    }

    #[test]
    fn test_join_path() {
        let url = join_path("https://tenant.okta.example/", "/oidc/me").unwrap();
        assert_eq!(url.as_str(), "https://tenant.okta.example/oidc/me");

        let url = join_path("https://tenant.okta.example/base", "api/v2/logout").unwrap();
        assert_eq!(url.as_str(), "https://tenant.okta.example/base/api/v2/logout");
    }
}
