//! PKCE and state token generation

use base64::Engine;
use rand::Rng;
use rand::distributions::Alphanumeric;
use sha2::{Digest, Sha256};

const VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 32;

fn random_token(len: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// Random PKCE code verifier (unreserved characters, 43-128 long)
pub(crate) fn code_verifier() -> String {
    random_token(VERIFIER_LEN)
}

/// S256 challenge: base64url(sha256(verifier)) without padding
pub(crate) fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest)
}

/// Random anti-forgery state value
pub(crate) fn state_token() -> String {
    random_token(STATE_LEN)
}
