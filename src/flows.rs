//! Authorization-code, refresh, and revocation flows.
//!
//! Every operation is a short-lived request/response interaction: look up the
//! descriptor, talk to the provider, update the secret store. Nothing here
//! retries on failure; retry policy belongs to the caller.

use crate::attempt::{ATTEMPT_TTL_SECONDS, AuthorizationAttempt};
use crate::error::{OAuthError, OAuthResult};
use crate::pkce;
use crate::registry::{ClientAuthMethod, ProviderDescriptor, ProviderRegistry};
use crate::store::{self, SecretStore};
use crate::token::{self, TokenSet};
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

/// Where to send the browser to start an authorization flow.
#[derive(Debug, Clone)]
pub struct AuthorizeRedirect {
    pub provider: String,
    pub redirect_url: String,
    pub state: String,
}

/// Query parameters delivered back to the callback endpoint by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

pub struct OAuthFlows {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn SecretStore>,
    http_client: Client,
}

fn attempt_key(session: &str) -> String {
    format!("attempt:{session}")
}

fn tokens_key(session: &str) -> String {
    format!("tokens:{session}")
}

impl OAuthFlows {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn SecretStore>,
        timeout: Duration,
    ) -> OAuthResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            // Following redirects opens the client up to SSRF vulnerabilities.
            .redirect(reqwest::redirect::Policy::none())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| OAuthError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            registry,
            store,
            http_client,
        })
    }

    pub fn http_client(&self) -> &Client {
        &self.http_client
    }

    /// Build the authorization redirect URL and persist the attempt.
    ///
    /// The attempt (state, and PKCE verifier where required) lives in the
    /// secret store until the callback consumes it or the TTL runs out. The
    /// actual browser redirect is the HTTP layer's concern.
    pub async fn start_authorization(
        &self,
        provider_name: &str,
        session: &str,
    ) -> OAuthResult<AuthorizeRedirect> {
        let provider = self.registry.descriptor(provider_name)?;

        let state = pkce::generate_state();
        let pkce_pair = provider.use_pkce.then(pkce::generate_pkce_pair);

        // Parsed and validated at startup by the registry
        let mut url = provider.authorization_endpoint.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("client_id", &provider.client_id);
            query.append_pair("redirect_uri", &provider.redirect_uri);
            query.append_pair("response_type", "code");
            query.append_pair("state", &state);
            if let Some(scope) = &provider.scope {
                query.append_pair("scope", scope);
            }
            if let Some(pair) = &pkce_pair {
                query.append_pair("code_challenge", &pair.challenge);
                query.append_pair("code_challenge_method", "S256");
            }
        }

        let attempt = AuthorizationAttempt {
            provider: provider.name.clone(),
            state: state.clone(),
            code_verifier: pkce_pair.map(|pair| pair.verifier),
            created_at: Utc::now(),
        };
        store::set_json(
            self.store.as_ref(),
            &provider.secret_namespace,
            &attempt_key(session),
            &attempt,
            Some(Duration::from_secs(ATTEMPT_TTL_SECONDS)),
        )
        .await?;

        tracing::debug!(provider = provider_name, "authorization flow started");

        Ok(AuthorizeRedirect {
            provider: provider.name.clone(),
            redirect_url: url.into(),
            state,
        })
    }

    /// Validate the callback and exchange the authorization code for tokens.
    ///
    /// The stored attempt is single use and is discarded before anything else
    /// can fail, so a mismatched or replayed callback can never be retried
    /// into a token exchange.
    pub async fn handle_callback(
        &self,
        provider_name: &str,
        session: &str,
        params: &CallbackParams,
    ) -> OAuthResult<TokenSet> {
        let provider = self.registry.descriptor(provider_name)?;
        let namespace = &provider.secret_namespace;
        let key = attempt_key(session);

        let attempt: Option<AuthorizationAttempt> =
            store::get_json(self.store.as_ref(), namespace, &key).await?;
        self.store.delete(namespace, &key).await?;

        if let Some(error) = &params.error {
            tracing::debug!(
                provider = provider_name,
                error = %error,
                description = ?params.error_description,
                "provider reported an error on callback"
            );
            return Err(OAuthError::MalformedCallback(format!(
                "provider returned error '{error}'"
            )));
        }
        let code = params
            .code
            .as_deref()
            .ok_or_else(|| OAuthError::MalformedCallback("missing code parameter".to_string()))?;
        let callback_state = params
            .state
            .as_deref()
            .ok_or_else(|| OAuthError::MalformedCallback("missing state parameter".to_string()))?;

        let attempt = attempt.ok_or(OAuthError::StateMismatch)?;
        if attempt.state != callback_state || attempt.provider != provider.name {
            return Err(OAuthError::StateMismatch);
        }

        let verifier = if provider.use_pkce {
            Some(
                attempt
                    .code_verifier
                    .ok_or_else(|| OAuthError::MissingVerifier(provider.name.clone()))?,
            )
        } else {
            None
        };

        let mut form: Vec<(&str, &str)> = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", provider.redirect_uri.as_str()),
        ];
        if let Some(verifier) = verifier.as_deref() {
            form.push(("code_verifier", verifier));
        }

        let response = self
            .token_request(provider, &form)
            .await
            .map_err(OAuthError::TokenExchangeFailed)?;

        let tokens = TokenSet::from_response(response);
        store::set_json(
            self.store.as_ref(),
            namespace,
            &tokens_key(session),
            &tokens,
            None,
        )
        .await?;

        tracing::debug!(provider = provider_name, "authorization code exchanged");
        Ok(tokens)
    }

    /// Perform the refresh-token grant and persist the replacement token set.
    pub async fn refresh(
        &self,
        provider_name: &str,
        session: &str,
        refresh_token: &str,
    ) -> OAuthResult<TokenSet> {
        let provider = self.registry.descriptor(provider_name)?;

        let form = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let response = self
            .token_request(provider, &form)
            .await
            .map_err(OAuthError::RefreshFailed)?;

        let tokens = TokenSet::from_response(response).carry_refresh_token(Some(refresh_token));
        store::set_json(
            self.store.as_ref(),
            &provider.secret_namespace,
            &tokens_key(session),
            &tokens,
            None,
        )
        .await?;

        tracing::debug!(provider = provider_name, "token set refreshed");
        Ok(tokens)
    }

    /// Revoke a token (RFC 7009) and delete the local copy.
    ///
    /// The local copy goes first: a user-initiated disconnect must never
    /// leave the session looking connected, whatever the provider says.
    /// Providers without a revocation endpoint are a local-only no-op.
    pub async fn revoke(
        &self,
        provider_name: &str,
        session: &str,
        access_token: &str,
    ) -> OAuthResult<()> {
        let provider = self.registry.descriptor(provider_name)?;
        self.store
            .delete(&provider.secret_namespace, &tokens_key(session))
            .await?;

        let Some(endpoint) = &provider.revocation_endpoint else {
            tracing::debug!(
                provider = provider_name,
                "no revocation endpoint; deleted local tokens only"
            );
            return Ok(());
        };

        let mut request = self.http_client.post(endpoint);
        let mut body: Vec<(&str, &str)> = vec![("token", access_token)];
        match provider.client_auth_method {
            ClientAuthMethod::Basic => {
                request = request.basic_auth(&provider.client_id, Some(&provider.client_secret));
            }
            ClientAuthMethod::Post => {
                body.push(("client_id", provider.client_id.as_str()));
                body.push(("client_secret", provider.client_secret.as_str()));
            }
        }

        let response = request
            .form(&body)
            .send()
            .await
            .map_err(|e| OAuthError::RevocationFailed(format!("request error: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::debug!(
                provider = provider_name,
                status = %status,
                body = %text,
                "revocation endpoint returned an error"
            );
            return Err(OAuthError::RevocationFailed(format!(
                "provider returned status {status}"
            )));
        }

        tracing::debug!(provider = provider_name, "token revoked");
        Ok(())
    }

    /// Currently stored token set for a (provider, session) pair, if any.
    pub async fn stored_tokens(
        &self,
        provider_name: &str,
        session: &str,
    ) -> OAuthResult<Option<TokenSet>> {
        let provider = self.registry.descriptor(provider_name)?;
        let tokens = store::get_json(
            self.store.as_ref(),
            &provider.secret_namespace,
            &tokens_key(session),
        )
        .await?;
        Ok(tokens)
    }

    /// Delete the stored token set without contacting the provider.
    pub async fn delete_tokens(&self, provider_name: &str, session: &str) -> OAuthResult<()> {
        let provider = self.registry.descriptor(provider_name)?;
        self.store
            .delete(&provider.secret_namespace, &tokens_key(session))
            .await?;
        Ok(())
    }

    /// POST a grant request to the token endpoint with per-provider client
    /// authentication and header overrides. Any 2xx with a parseable token
    /// payload is success; some providers answer 201 on a valid grant.
    async fn token_request(
        &self,
        provider: &ProviderDescriptor,
        form: &[(&str, &str)],
    ) -> Result<token::TokenEndpointResponse, String> {
        let mut request = self.http_client.post(&provider.token_endpoint);
        let mut body: Vec<(&str, &str)> = form.to_vec();

        match provider.client_auth_method {
            ClientAuthMethod::Basic => {
                request = request.basic_auth(&provider.client_id, Some(&provider.client_secret));
            }
            ClientAuthMethod::Post => {
                body.push(("client_id", provider.client_id.as_str()));
                body.push(("client_secret", provider.client_secret.as_str()));
            }
        }
        for (name, value) in &provider.token_request_headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .form(&body)
            .send()
            .await
            .map_err(|e| format!("request error: {e}"))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| format!("failed to read response: {e}"))?;

        if !status.is_success() {
            tracing::debug!(
                provider = %provider.name,
                status = %status,
                body = %text,
                "token endpoint returned an error"
            );
            return Err(format!("provider returned status {status}"));
        }

        token::parse_token_body(&text).ok_or_else(|| {
            tracing::debug!(
                provider = %provider.name,
                status = %status,
                body = %text,
                "token endpoint returned an unparseable body"
            );
            format!("unparseable token response (status {status})")
        })
    }
}
