//! Token-endpoint responses and persisted token sets.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Wire shape of an RFC 6749 token response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenEndpointResponse {
    pub access_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Persisted result of a successful exchange or refresh.
///
/// `expires_in` is relative to issuance, so the absolute issuance instant is
/// recorded alongside it. Superseded wholesale on refresh, deleted wholesale
/// on revoke or disconnect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: Option<u64>,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
    pub issued_at: DateTime<Utc>,
}

impl TokenSet {
    pub fn from_response(response: TokenEndpointResponse) -> Self {
        Self {
            access_token: response.access_token,
            token_type: response.token_type,
            expires_in: response.expires_in,
            refresh_token: response.refresh_token,
            scope: response.scope,
            issued_at: Utc::now(),
        }
    }

    /// A refresh response lacking a new refresh token means the previous one
    /// stays valid; carry it over instead of discarding it.
    pub fn carry_refresh_token(mut self, previous: Option<&str>) -> Self {
        if self.refresh_token.is_none() {
            self.refresh_token = previous.map(str::to_string);
        }
        self
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| self.issued_at + Duration::seconds(secs as i64))
    }
}

/// Parse a token-endpoint body: JSON first, then form-urlencoded.
///
/// GitHub answers `application/x-www-form-urlencoded` unless the request
/// carries `Accept: application/json`, so the fallback keeps the exchange
/// working even when the Accept override is not configured.
pub fn parse_token_body(body: &str) -> Option<TokenEndpointResponse> {
    if let Ok(response) = serde_json::from_str::<TokenEndpointResponse>(body) {
        return Some(response);
    }

    let pairs: HashMap<String, String> = url::form_urlencoded::parse(body.as_bytes())
        .into_owned()
        .collect();
    if pairs.contains_key("error") {
        return None;
    }
    Some(TokenEndpointResponse {
        access_token: pairs.get("access_token").filter(|t| !t.is_empty())?.clone(),
        token_type: pairs
            .get("token_type")
            .cloned()
            .unwrap_or_else(default_token_type),
        expires_in: pairs.get("expires_in").and_then(|v| v.parse().ok()),
        refresh_token: pairs.get("refresh_token").cloned(),
        scope: pairs.get("scope").cloned(),
    })
}
