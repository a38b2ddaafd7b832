use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// TTL for a pending authorization attempt (10 minutes).
pub const ATTEMPT_TTL_SECONDS: u64 = 600;

/// Transient record created at authorize-start and consumed at callback.
///
/// Single use: the callback engine deletes it whether or not the exchange
/// succeeds. Starting a new flow for the same (provider, session) pair
/// overwrites it, invalidating the previous attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorizationAttempt {
    pub provider: String,
    pub state: String,
    /// Present iff the provider requires PKCE.
    pub code_verifier: Option<String>,
    pub created_at: DateTime<Utc>,
}
