//! PKCE (Proof Key for Code Exchange) per RFC 7636
//!
//! The verifier stays with the caller and is sent during token exchange; the
//! S256 challenge goes into the authorization URL exactly once. Neither is
//! ever persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};

/// Random bytes behind each verifier. 64 bytes encode to 86 URL-safe
/// characters, inside the 43-128 range RFC 7636 allows.
const VERIFIER_BYTES: usize = 64;

/// A fresh verifier and its derived challenge.
#[derive(Debug, Clone)]
pub struct PkcePair {
    pub verifier: String,
    pub challenge: String,
}

/// Generate an independent verifier/challenge pair.
pub fn generate() -> PkcePair {
    let verifier = generate_verifier();
    let challenge = compute_challenge(&verifier);
    PkcePair {
        verifier,
        challenge,
    }
}

/// Generate a cryptographically random code verifier.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; VERIFIER_BYTES];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// `challenge = BASE64URL-NOPAD(SHA256(verifier))`
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_url_safe(s: &str) -> bool {
        s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    #[test]
    fn verifier_length_is_within_rfc_range() {
        let verifier = generate_verifier();
        assert_eq!(verifier.len(), 86);
        assert!((43..=128).contains(&verifier.len()));
        assert!(is_url_safe(&verifier), "not URL-safe: {verifier}");
    }

    #[test]
    fn pairs_are_independent() {
        let a = generate();
        let b = generate();
        assert_ne!(a.verifier, b.verifier);
        assert_ne!(a.challenge, b.challenge);
    }

    #[test]
    fn challenge_is_derived_from_verifier() {
        for _ in 0..16 {
            let pair = generate();
            assert_eq!(pair.challenge, compute_challenge(&pair.verifier));
            assert_eq!(pair.challenge.len(), 43);
            assert!(!pair.challenge.ends_with('='));
            assert!(is_url_safe(&pair.challenge));
        }
    }

    #[test]
    fn challenge_matches_rfc_7636_appendix_b() {
        let challenge = compute_challenge("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk");
        assert_eq!(challenge, "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM");
    }

    #[test]
    fn challenge_decodes_to_sha256_digest() {
        let pair = generate();
        let decoded = URL_SAFE_NO_PAD.decode(&pair.challenge).unwrap();
        assert_eq!(decoded.as_slice(), Sha256::digest(pair.verifier.as_bytes()).as_slice());
    }
}
