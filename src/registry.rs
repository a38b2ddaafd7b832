//! Provider registry: the closed set of configured providers.
//!
//! Descriptors are built once at startup and read-only afterwards. Unknown
//! provider identifiers are rejected here, before any network call runs.

use crate::config::{Config, apply_predefined_provider_defaults};
use crate::error::{OAuthError, OAuthResult};
use std::collections::HashMap;
use std::fmt;
use url::Url;

pub use crate::config::ClientAuthMethod;

/// Immutable OAuth metadata for one provider.
#[derive(Clone)]
pub struct ProviderDescriptor {
    pub name: String,
    pub client_id: String,
    pub client_secret: String,
    /// Parsed at startup so the request path never trips over a bad URL.
    pub authorization_endpoint: Url,
    pub token_endpoint: String,
    pub revocation_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub client_auth_method: ClientAuthMethod,
    pub use_pkce: bool,
    pub scope: Option<String>,
    pub redirect_uri: String,
    pub secret_namespace: String,
    pub token_request_headers: Vec<(String, String)>,
    pub userinfo_headers: Vec<(String, String)>,
}

// client_secret must never end up in logs
impl fmt::Debug for ProviderDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDescriptor")
            .field("name", &self.name)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("authorization_endpoint", &self.authorization_endpoint)
            .field("token_endpoint", &self.token_endpoint)
            .field("revocation_endpoint", &self.revocation_endpoint)
            .field("userinfo_endpoint", &self.userinfo_endpoint)
            .field("client_auth_method", &self.client_auth_method)
            .field("use_pkce", &self.use_pkce)
            .field("scope", &self.scope)
            .field("redirect_uri", &self.redirect_uri)
            .field("secret_namespace", &self.secret_namespace)
            .finish_non_exhaustive()
    }
}

/// Provider display name mapping
pub fn get_display_name(provider_name: &str) -> String {
    match provider_name {
        "github" => "GitHub".to_string(),
        "supabase" => "Supabase".to_string(),
        "google" => "Google".to_string(),
        "gitlab" => "GitLab".to_string(),
        _ => provider_name.to_string(),
    }
}

#[derive(Debug)]
pub struct ProviderRegistry {
    descriptors: HashMap<String, ProviderDescriptor>,
}

impl ProviderRegistry {
    /// Build descriptors for every configured provider, applying predefined
    /// defaults first. Missing required fields are fatal here, not at
    /// request time.
    pub fn from_config(config: &Config) -> OAuthResult<Self> {
        let mut descriptors = HashMap::new();

        for (name, settings) in &config.providers {
            let mut settings = settings.clone();
            apply_predefined_provider_defaults(name, &mut settings);

            let require = |field: Option<String>, what: &str| {
                field.ok_or_else(|| {
                    OAuthError::Configuration(format!(
                        "provider '{name}' is missing {what}"
                    ))
                })
            };

            let valid_url = |url: &str, what: &str| {
                Url::parse(url).map_err(|e| {
                    OAuthError::Configuration(format!(
                        "provider '{name}' has an invalid {what}: {e}"
                    ))
                })
            };

            if settings.client_id.is_empty() {
                return Err(OAuthError::Configuration(format!(
                    "provider '{name}' is missing a client_id"
                )));
            }
            if settings.client_secret.is_empty() {
                return Err(OAuthError::Configuration(format!(
                    "provider '{name}' is missing a client_secret"
                )));
            }

            let authorization_endpoint = valid_url(
                &require(settings.authorization_url, "an authorization_url")?,
                "authorization_url",
            )?;
            let token_endpoint = require(settings.token_url, "a token_url")?;
            valid_url(&token_endpoint, "token_url")?;
            if let Some(url) = &settings.revocation_url {
                valid_url(url, "revocation_url")?;
            }
            if let Some(url) = &settings.userinfo_url {
                valid_url(url, "userinfo_url")?;
            }

            let descriptor = ProviderDescriptor {
                name: name.clone(),
                client_id: settings.client_id,
                client_secret: settings.client_secret,
                authorization_endpoint,
                token_endpoint,
                revocation_endpoint: settings.revocation_url,
                userinfo_endpoint: settings.userinfo_url,
                client_auth_method: settings.auth_method.unwrap_or(ClientAuthMethod::Post),
                use_pkce: settings.use_pkce.unwrap_or(false),
                scope: settings.scope,
                redirect_uri: require(settings.redirect_uri, "a redirect_uri")?,
                secret_namespace: settings
                    .secret_namespace
                    .unwrap_or_else(|| format!("oauth:{name}")),
                token_request_headers: settings.token_request_headers.into_iter().collect(),
                userinfo_headers: settings.userinfo_headers.into_iter().collect(),
            };

            descriptors.insert(name.clone(), descriptor);
        }

        Ok(Self {
            descriptors,
        })
    }

    pub fn descriptor(&self, provider: &str) -> OAuthResult<&ProviderDescriptor> {
        self.descriptors
            .get(provider)
            .ok_or_else(|| OAuthError::UnknownProvider(provider.to_string()))
    }

    pub fn provider_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.descriptors.keys().cloned().collect();
        names.sort();
        names
    }
}
