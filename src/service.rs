//! Service facade wiring the registry, flows, and normalizer together.

use crate::config::Config;
use crate::error::OAuthResult;
use crate::flows::{AuthorizeRedirect, CallbackParams, OAuthFlows};
use crate::health::OAuthHealthChecker;
use crate::identity::{Identity, IdentityClient};
use crate::registry::{ProviderRegistry, get_display_name};
use crate::store::SecretStore;
use crate::token::TokenSet;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub name: String,
    pub display_name: String,
    pub scope: Option<String>,
}

/// One uniform contract over every configured provider: connect, get current
/// user, refresh, revoke. The HTTP layer on top only translates wire formats.
pub struct OAuthService {
    config: Arc<Config>,
    registry: Arc<ProviderRegistry>,
    flows: OAuthFlows,
    identity: IdentityClient,
}

impl OAuthService {
    pub fn new(config: Config, store: Arc<dyn SecretStore>) -> OAuthResult<Self> {
        let registry = Arc::new(ProviderRegistry::from_config(&config)?);
        let timeout = Duration::from_secs(config.http.timeout_secs);
        let flows = OAuthFlows::new(registry.clone(), store, timeout)?;
        let identity = IdentityClient::new(flows.http_client().clone());

        Ok(Self {
            config: Arc::new(config),
            registry,
            flows,
            identity,
        })
    }

    pub async fn start_authorization(
        &self,
        provider: &str,
        session: &str,
    ) -> OAuthResult<AuthorizeRedirect> {
        self.flows.start_authorization(provider, session).await
    }

    pub async fn handle_callback(
        &self,
        provider: &str,
        session: &str,
        params: &CallbackParams,
    ) -> OAuthResult<TokenSet> {
        self.flows.handle_callback(provider, session, params).await
    }

    pub async fn refresh(
        &self,
        provider: &str,
        session: &str,
        refresh_token: &str,
    ) -> OAuthResult<TokenSet> {
        self.flows.refresh(provider, session, refresh_token).await
    }

    pub async fn revoke(
        &self,
        provider: &str,
        session: &str,
        access_token: &str,
    ) -> OAuthResult<()> {
        self.flows.revoke(provider, session, access_token).await
    }

    pub async fn get_identity(&self, provider: &str, access_token: &str) -> OAuthResult<Identity> {
        let descriptor = self.registry.descriptor(provider)?;
        self.identity.fetch(descriptor, access_token).await
    }

    /// Token validity is defined as "the identity endpoint accepts it".
    /// Any failure means invalid; this never errors.
    pub async fn validate(&self, provider: &str, access_token: &str) -> bool {
        self.get_identity(provider, access_token).await.is_ok()
    }

    pub async fn stored_tokens(
        &self,
        provider: &str,
        session: &str,
    ) -> OAuthResult<Option<TokenSet>> {
        self.flows.stored_tokens(provider, session).await
    }

    /// Drop the local token set without contacting the provider.
    pub async fn disconnect(&self, provider: &str, session: &str) -> OAuthResult<()> {
        self.flows.delete_tokens(provider, session).await
    }

    /// Stored tokens plus the live identity they resolve to, or `None` when
    /// the session has no tokens for this provider.
    pub async fn connection(
        &self,
        provider: &str,
        session: &str,
    ) -> OAuthResult<Option<(TokenSet, Identity)>> {
        let Some(tokens) = self.stored_tokens(provider, session).await? else {
            return Ok(None);
        };
        let identity = self.get_identity(provider, &tokens.access_token).await?;
        Ok(Some((tokens, identity)))
    }

    pub fn list_providers(&self) -> Vec<ProviderInfo> {
        self.registry
            .provider_names()
            .into_iter()
            .filter_map(|name| {
                self.registry.descriptor(&name).ok().map(|descriptor| ProviderInfo {
                    name: name.clone(),
                    display_name: get_display_name(&name),
                    scope: descriptor.scope.clone(),
                })
            })
            .collect()
    }

    pub fn health_checker(&self) -> OAuthHealthChecker {
        OAuthHealthChecker::new(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderSettings;
    use crate::error::OAuthError;
    use crate::store::MemoryStore;
    use url::Url;

    fn create_test_config() -> Config {
        let mut config = Config::default();
        config.providers.insert(
            "github".to_string(),
            ProviderSettings {
                client_id: "gh-id".to_string(),
                client_secret: "gh-secret".to_string(),
                redirect_uri: Some("http://localhost:3000/callback/github".to_string()),
                ..Default::default()
            },
        );
        config
    }

    fn create_service() -> OAuthService {
        OAuthService::new(create_test_config(), Arc::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_start_authorization_builds_redirect() {
        let service = create_service();

        let redirect = service.start_authorization("github", "sess-1").await.unwrap();
        assert_eq!(redirect.provider, "github");
        assert!(!redirect.state.is_empty());

        let url = Url::parse(&redirect.redirect_url).unwrap();
        assert_eq!(url.host_str(), Some("github.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("client_id".to_string(), "gh-id".to_string())));
        assert!(pairs.contains(&("response_type".to_string(), "code".to_string())));
        assert!(pairs.contains(&("state".to_string(), redirect.state.clone())));
        // GitHub does not use PKCE
        assert!(!pairs.iter().any(|(name, _)| name == "code_challenge"));
    }

    #[tokio::test]
    async fn test_unknown_provider_rejected_before_any_network_call() {
        let service = create_service();

        let err = service.start_authorization("unknown", "sess-1").await.unwrap_err();
        assert!(matches!(err, OAuthError::UnknownProvider(_)));

        let err = service.refresh("unknown", "sess-1", "ref").await.unwrap_err();
        assert!(matches!(err, OAuthError::UnknownProvider(_)));

        let err = service.revoke("unknown", "sess-1", "tok").await.unwrap_err();
        assert!(matches!(err, OAuthError::UnknownProvider(_)));

        let err = service.get_identity("unknown", "tok").await.unwrap_err();
        assert!(matches!(err, OAuthError::UnknownProvider(_)));
    }

    #[tokio::test]
    async fn test_misconfigured_provider_fails_at_construction() {
        let mut config = create_test_config();
        config.providers.get_mut("github").unwrap().client_secret = String::new();

        let result = OAuthService::new(config, Arc::new(MemoryStore::new()));
        assert!(matches!(result, Err(OAuthError::Configuration(_))));
    }

    #[tokio::test]
    async fn test_list_providers() {
        let service = create_service();

        let providers = service.list_providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].name, "github");
        assert_eq!(providers[0].display_name, "GitHub");
        assert_eq!(providers[0].scope.as_deref(), Some("read:user user:email"));
    }

    #[tokio::test]
    async fn test_stored_tokens_empty_for_new_session() {
        let service = create_service();
        let tokens = service.stored_tokens("github", "sess-1").await.unwrap();
        assert!(tokens.is_none());
    }

    #[tokio::test]
    async fn test_connection_none_without_tokens() {
        let service = create_service();
        let connection = service.connection("github", "sess-1").await.unwrap();
        assert!(connection.is_none());
    }
}
