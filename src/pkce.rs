//! State and PKCE material generation (RFC 7636).
//!
//! Everything here is pure and side-effect free apart from the system CSPRNG,
//! so it can be exercised directly by unit tests without network access.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes behind a state token (256 bits of entropy).
const STATE_BYTES: usize = 32;

/// Random bytes behind a code verifier. 32 bytes base64url-encode to 43
/// characters, the RFC 7636 minimum verifier length.
const VERIFIER_BYTES: usize = 32;

/// A PKCE verifier/challenge pair (S256 method).
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// Generate an opaque anti-CSRF state token, URL-safe, single use.
pub fn generate_state() -> String {
    random_urlsafe(STATE_BYTES)
}

/// Generate a PKCE code verifier and its S256 challenge.
pub fn generate_pkce_pair() -> PkcePair {
    let verifier = random_urlsafe(VERIFIER_BYTES);
    let challenge = code_challenge(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}

/// Derive the S256 code challenge for a verifier:
/// base64url(SHA-256(verifier)) with no padding, per RFC 7636 §4.2.
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

fn random_urlsafe(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
