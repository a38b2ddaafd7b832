use thiserror::Error;

/// Error taxonomy for the OAuth engine.
///
/// Per-request failures are returned as structured variants to the caller.
/// Raw provider payloads and client secrets stay in diagnostic logs and never
/// appear in the error text. `Configuration` is raised at startup only.
#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("unknown OAuth provider: {0}")]
    UnknownProvider(String),

    #[error("malformed callback: {0}")]
    MalformedCallback(String),

    /// The callback state did not match a live authorization attempt. The
    /// attempt is discarded either way; the flow must be restarted.
    #[error("state token mismatch")]
    StateMismatch,

    #[error("missing PKCE verifier for provider '{0}'")]
    MissingVerifier(String),

    #[error("token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("token revocation failed: {0}")]
    RevocationFailed(String),

    #[error("identity fetch failed: {0}")]
    IdentityFetchFailed(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("secret store error: {0}")]
    Store(#[from] crate::store::StoreError),
}

pub type OAuthResult<T> = Result<T, OAuthError>;
