//! Cross-provider identity normalization.
//!
//! Providers disagree on every field name. The normalizer maps whatever the
//! userinfo (or provider REST) endpoint returns into one canonical record,
//! keeping the original payload around for provider-specific downstream use.

use crate::error::{OAuthError, OAuthResult};
use crate::registry::ProviderDescriptor;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

/// Canonical identity record. `id` is provider-scoped, required, and stable
/// across calls for the same account.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    /// Original payload, preserved verbatim.
    pub raw: Value,
}

/// Map a raw userinfo payload to an [`Identity`] with provider-agnostic
/// field precedence. Numbers are stringified (GitHub numeric ids).
pub fn normalize(provider_name: &str, raw: Value) -> OAuthResult<Identity> {
    let id = pick(&raw, &["sub", "id"]).ok_or_else(|| {
        OAuthError::IdentityFetchFailed(format!(
            "no subject identifier in '{provider_name}' payload"
        ))
    })?;

    Ok(Identity {
        id,
        email: pick(&raw, &["email"]),
        display_name: pick(&raw, &["name", "display_name", "full_name"]),
        username: pick(&raw, &["preferred_username", "username", "login"]),
        avatar_url: pick(&raw, &["picture", "avatar_url"]),
        raw,
    })
}

/// First present, non-empty field among `keys`, as a string.
fn pick(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match raw.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

pub struct IdentityClient {
    http_client: Client,
}

impl IdentityClient {
    pub fn new(http_client: Client) -> Self {
        Self {
            http_client,
        }
    }

    /// Fetch and normalize the authenticated subject's profile.
    ///
    /// Subject verification against an id_token issuer chain is intentionally
    /// skipped; this client does not maintain one.
    pub async fn fetch(
        &self,
        provider: &ProviderDescriptor,
        access_token: &str,
    ) -> OAuthResult<Identity> {
        let endpoint = provider.userinfo_endpoint.as_ref().ok_or_else(|| {
            OAuthError::IdentityFetchFailed(format!(
                "no userinfo endpoint configured for provider '{}'",
                provider.name
            ))
        })?;

        let mut request = self.http_client.get(endpoint).bearer_auth(access_token);
        for (name, value) in &provider.userinfo_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| OAuthError::IdentityFetchFailed(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(
                provider = %provider.name,
                status = %status,
                "userinfo endpoint returned an error"
            );
            return Err(OAuthError::IdentityFetchFailed(format!(
                "provider returned status {status}"
            )));
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| OAuthError::IdentityFetchFailed(format!("invalid JSON: {e}")))?;

        normalize(&provider.name, raw)
    }
}
