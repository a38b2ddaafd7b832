//! Multi-provider OAuth 2.0 / OIDC client engine.
//!
//! One application, several independent authorization servers, one uniform
//! contract: start an authorization flow, handle the callback, refresh,
//! revoke, and resolve the current user. Providers differ on endpoint
//! shapes, client-authentication methods, PKCE requirements, and userinfo
//! formats; the descriptor registry makes those differences data, not code.
//!
//! The HTTP routing layer and session storage are collaborators: routes call
//! [`OAuthService`], and secrets live behind the [`store::SecretStore`]
//! trait.

pub mod attempt;
pub mod config;
pub mod error;
pub mod flows;
pub mod health;
pub mod identity;
pub mod pkce;
pub mod registry;
pub mod service;
pub mod store;
pub mod token;

pub use config::{ClientAuthMethod, Config, ProviderSettings};
pub use error::{OAuthError, OAuthResult};
pub use flows::{AuthorizeRedirect, CallbackParams, OAuthFlows};
pub use identity::Identity;
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use service::{OAuthService, ProviderInfo};
pub use store::{MemoryStore, SecretStore};
pub use token::TokenSet;
