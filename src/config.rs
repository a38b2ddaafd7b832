use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// How the client proves its identity to the token endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    /// `Authorization: Basic base64(client_id:client_secret)`
    Basic,
    /// `client_id`/`client_secret` as form body parameters
    Post,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub providers: HashMap<String, ProviderSettings>,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Timeout for all provider network calls, in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Per-provider settings as supplied by the operator.
///
/// For known providers (`github`, `supabase`, `google`, `gitlab`) only the
/// credentials and redirect URI are required; endpoints, scopes, and quirks
/// are filled in by [`apply_predefined_provider_defaults`].
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct ProviderSettings {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub authorization_url: Option<String>,
    #[serde(default)]
    pub token_url: Option<String>,
    #[serde(default)]
    pub revocation_url: Option<String>,
    #[serde(default)]
    pub userinfo_url: Option<String>,
    #[serde(default)]
    pub auth_method: Option<ClientAuthMethod>,
    #[serde(default)]
    pub use_pkce: Option<bool>,
    /// Prefix isolating this provider's secrets from others sharing the
    /// same store. Defaults to `oauth:{name}`.
    #[serde(default)]
    pub secret_namespace: Option<String>,
    /// Extra headers sent with token-endpoint requests. Some providers
    /// need these to answer in a standard encoding at all.
    #[serde(default)]
    pub token_request_headers: HashMap<String, String>,
    /// Extra headers sent with userinfo requests.
    #[serde(default)]
    pub userinfo_headers: HashMap<String, String>,
    // For Supabase, the project base URL endpoints derive from
    #[serde(default)]
    pub project_url: Option<String>,
    // For GitLab self-hosted instances
    #[serde(default)]
    pub instance_url: Option<String>,
}

// client_secret must never end up in logs
impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scope", &self.scope)
            .field("authorization_url", &self.authorization_url)
            .field("token_url", &self.token_url)
            .field("revocation_url", &self.revocation_url)
            .field("userinfo_url", &self.userinfo_url)
            .field("auth_method", &self.auth_method)
            .field("use_pkce", &self.use_pkce)
            .field("secret_namespace", &self.secret_namespace)
            .finish_non_exhaustive()
    }
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if Path::new("config.yaml").exists() {
            builder = builder.add_source(File::with_name("config"));
        }

        builder = builder.add_source(
            Environment::with_prefix("OAUTH")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let mut builder =
            ConfigBuilder::builder().add_source(config::Config::try_from(&Config::default())?);

        if path.as_ref().exists() {
            builder = builder.add_source(File::from(path.as_ref()));
        }

        builder = builder.add_source(
            Environment::with_prefix("OAUTH")
                .prefix_separator("_")
                .separator("__"),
        );

        builder.build()?.try_deserialize()
    }
}

/// Apply predefined endpoint/scope/quirk defaults based on provider name.
///
/// Only fills fields the operator left unset; explicit settings always win.
pub fn apply_predefined_provider_defaults(provider_name: &str, settings: &mut ProviderSettings) {
    match provider_name {
        "github" => apply_github_defaults(settings),
        "supabase" => apply_supabase_defaults(settings),
        "google" => apply_google_defaults(settings),
        "gitlab" => apply_gitlab_defaults(settings),
        _ => {} // Custom provider, no defaults to apply
    }
}

fn apply_github_defaults(settings: &mut ProviderSettings) {
    if settings.authorization_url.is_none() {
        settings.authorization_url = Some("https://github.com/login/oauth/authorize".to_string());
    }
    if settings.token_url.is_none() {
        settings.token_url = Some("https://github.com/login/oauth/access_token".to_string());
    }
    if settings.userinfo_url.is_none() {
        settings.userinfo_url = Some("https://api.github.com/user".to_string());
    }
    if settings.scope.is_none() {
        settings.scope = Some("read:user user:email".to_string());
    }
    if settings.auth_method.is_none() {
        settings.auth_method = Some(ClientAuthMethod::Post);
    }
    // The live GitHub integration does not use PKCE
    if settings.use_pkce.is_none() {
        settings.use_pkce = Some(false);
    }
    // Without this, GitHub answers the token request form-urlencoded
    settings
        .token_request_headers
        .entry("Accept".to_string())
        .or_insert_with(|| "application/json".to_string());
    settings
        .userinfo_headers
        .entry("Accept".to_string())
        .or_insert_with(|| "application/vnd.github+json".to_string());
}

fn apply_supabase_defaults(settings: &mut ProviderSettings) {
    if let Some(project) = settings.project_url.clone() {
        let project = project.trim_end_matches('/');
        if settings.authorization_url.is_none() {
            settings.authorization_url = Some(format!("{project}/auth/v1/authorize"));
        }
        if settings.token_url.is_none() {
            settings.token_url = Some(format!("{project}/auth/v1/token"));
        }
        if settings.userinfo_url.is_none() {
            settings.userinfo_url = Some(format!("{project}/auth/v1/user"));
        }
    }
    if settings.scope.is_none() {
        settings.scope = Some("openid email profile".to_string());
    }
    if settings.auth_method.is_none() {
        settings.auth_method = Some(ClientAuthMethod::Basic);
    }
    if settings.use_pkce.is_none() {
        settings.use_pkce = Some(true);
    }
}

fn apply_google_defaults(settings: &mut ProviderSettings) {
    if settings.authorization_url.is_none() {
        settings.authorization_url =
            Some("https://accounts.google.com/o/oauth2/v2/auth".to_string());
    }
    if settings.token_url.is_none() {
        settings.token_url = Some("https://oauth2.googleapis.com/token".to_string());
    }
    if settings.revocation_url.is_none() {
        settings.revocation_url = Some("https://oauth2.googleapis.com/revoke".to_string());
    }
    if settings.userinfo_url.is_none() {
        settings.userinfo_url =
            Some("https://openidconnect.googleapis.com/v1/userinfo".to_string());
    }
    if settings.scope.is_none() {
        settings.scope = Some("openid email profile".to_string());
    }
    if settings.auth_method.is_none() {
        settings.auth_method = Some(ClientAuthMethod::Post);
    }
    if settings.use_pkce.is_none() {
        settings.use_pkce = Some(true);
    }
}

fn apply_gitlab_defaults(settings: &mut ProviderSettings) {
    let instance = settings
        .instance_url
        .clone()
        .unwrap_or_else(|| "https://gitlab.com".to_string());
    let instance = instance.trim_end_matches('/');
    if settings.authorization_url.is_none() {
        settings.authorization_url = Some(format!("{instance}/oauth/authorize"));
    }
    if settings.token_url.is_none() {
        settings.token_url = Some(format!("{instance}/oauth/token"));
    }
    if settings.revocation_url.is_none() {
        settings.revocation_url = Some(format!("{instance}/oauth/revoke"));
    }
    if settings.userinfo_url.is_none() {
        settings.userinfo_url = Some(format!("{instance}/oauth/userinfo"));
    }
    if settings.scope.is_none() {
        settings.scope = Some("read_user".to_string());
    }
    if settings.auth_method.is_none() {
        settings.auth_method = Some(ClientAuthMethod::Post);
    }
    if settings.use_pkce.is_none() {
        settings.use_pkce = Some(true);
    }
}
