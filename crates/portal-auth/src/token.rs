//! Token responses from the login and refresh endpoints.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use portal_storage::TokenBundle;
use serde::Deserialize;
use serde_json::Value;

/// Token fields as issued by the backend.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TokenPayload {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenPayload {
    /// Extract the token payload from either the wrapped
    /// `{data:{body:{...}}}` shape or a flat token object.
    pub fn from_response(body: &Value) -> Option<Self> {
        let candidate = match body.pointer("/data/body") {
            Some(inner) if inner.get("access_token").is_some() => inner,
            _ => body,
        };
        let payload: TokenPayload = serde_json::from_value(candidate.clone()).ok()?;
        (!payload.access_token.is_empty()).then_some(payload)
    }

    /// Build a bundle, keeping `previous_refresh_token` when none was issued.
    ///
    /// Returns `None` when there is no refresh token at all, or when
    /// `expires_in` is outside the representable range.
    pub fn into_bundle(
        self,
        now: DateTime<Utc>,
        previous_refresh_token: Option<&str>,
    ) -> Option<TokenBundle> {
        let refresh_token = self
            .refresh_token
            .filter(|token| !token.is_empty())
            .or_else(|| previous_refresh_token.map(str::to_string))?;

        let expires_at = match self.expires_in {
            Some(seconds) => {
                Some(Duration::try_seconds(seconds).and_then(|d| now.checked_add_signed(d))?)
            }
            None => jwt_expiry(&self.access_token),
        };

        Some(TokenBundle {
            access_token: self.access_token,
            refresh_token,
            id_token: self.id_token,
            expires_at,
        })
    }
}

/// Backend-supplied error description, if the body has one.
pub(crate) fn error_description(body: &Value) -> Option<String> {
    ["/data/body/error_description", "/error_description", "/message"]
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|text| !text.is_empty())
        .map(str::to_string)
}

/// Read the `exp` claim of a JWT without verifying it.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Value = serde_json::from_slice(&decoded).ok()?;
    let exp = claims.get("exp")?.as_i64()?;
    DateTime::from_timestamp(exp, 0)
}
