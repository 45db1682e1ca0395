//! PKCE S256 parameter generation
//!
//! This module implements the Proof Key for Code Exchange (PKCE) extension
//! to OAuth 2.0 as defined in RFC 7636, using the `S256` challenge method,
//! plus generation of the `state` CSRF-binding nonce that travels alongside
//! the PKCE parameters through the authorization redirect.
//!
//! # How PKCE works
//!
//! 1. The client generates a high-entropy random string called the
//!    `code_verifier`.
//! 2. The client computes a SHA-256 hash of the verifier and base64url-encodes
//!    it to produce the `code_challenge`.
//! 3. The authorization request includes `code_challenge` and
//!    `code_challenge_method=S256`.
//! 4. The token exchange request includes the original `code_verifier`,
//!    proving possession without the verifier ever crossing the redirect.
//!
//! # References
//!
//! - RFC 7636 <https://www.rfc-editor.org/rfc/rfc7636>
//! - OAuth 2.1 draft <https://datatracker.ietf.org/doc/draft-ietf-oauth-v2-1/>

use base64::Engine as _;
use sha2::{Digest, Sha256};

/// Length of a generated code verifier, in characters.
///
/// RFC 7636 section 4.1 allows 43 to 128 characters; this crate always
/// generates the maximum.
pub const VERIFIER_LENGTH: usize = 128;

/// The unreserved URI characters allowed in a code verifier
/// (RFC 7636 section 4.1).
const VERIFIER_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";

// ---------------------------------------------------------------------------
// Public functions
// ---------------------------------------------------------------------------

/// Generates a random `state` nonce for CSRF binding.
///
/// 16 random bytes encoded as base64url without padding (22 characters).
/// The value only needs to make state-fixation attacks impractical; the
/// non-collision guarantee across concurrent flows is probabilistic.
///
/// # Examples
///
/// ```
/// let state = authflow::pkce::generate_state();
/// assert!(!state.is_empty());
/// assert_ne!(state, authflow::pkce::generate_state());
/// ```
pub fn generate_state() -> String {
    use rand::RngCore as _;

    let mut bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Generates a random PKCE code verifier.
///
/// The verifier is exactly [`VERIFIER_LENGTH`] characters sampled uniformly
/// (with replacement) from the 66-character unreserved-URI alphabet
/// `A-Z a-z 0-9 - . _ ~`.
///
/// # Examples
///
/// ```
/// use authflow::pkce::{generate_verifier, VERIFIER_LENGTH};
///
/// let verifier = generate_verifier();
/// assert_eq!(verifier.len(), VERIFIER_LENGTH);
/// ```
pub fn generate_verifier() -> String {
    use rand::Rng as _;

    let mut rng = rand::rng();
    (0..VERIFIER_LENGTH)
        .map(|_| {
            let idx = rng.random_range(0..VERIFIER_ALPHABET.len());
            VERIFIER_ALPHABET[idx] as char
        })
        .collect()
}

/// Computes the S256 code challenge for a verifier.
///
/// Per RFC 7636 section 4.2 the challenge is
/// `BASE64URL(SHA256(ASCII(code_verifier)))` without padding. The function
/// is deterministic: the same verifier always yields the same challenge,
/// which the authorization server relies on when it recomputes the challenge
/// during the token exchange.
///
/// # Examples
///
/// ```
/// use authflow::pkce::compute_challenge;
///
/// // RFC 7636 Appendix B test vector.
/// let challenge = compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
/// assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
/// ```
#[must_use]
pub fn compute_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(digest.as_slice())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
