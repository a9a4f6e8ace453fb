//! Signed tokens: `payload + "." + hex(sha256(payload + "." + secret))`.
//!
//! A token is valid iff recomputing the digest over its own payload with the
//! current secret matches its digest segment. Session-id payloads are fresh
//! 256-bit random values, never derived from client input.

use rand::RngCore;
use sha2::{Digest, Sha256};

fn digest(payload: &str, secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload.as_bytes());
    hasher.update(b".");
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Sign an opaque payload with the server secret.
pub fn sign(payload: &str, secret: &str) -> String {
    format!("{}.{}", payload, digest(payload, secret))
}

/// Verify a token. Splits on the first `.` (reserved as the payload/digest
/// separator); a token of the wrong shape is simply invalid.
pub fn verify(token: &str, secret: &str) -> bool {
    match token.split_once('.') {
        Some((payload, sig)) => sig == digest(payload, secret),
        None => false,
    }
}

/// Mint a fresh signed session id from 32 bytes of OS randomness.
pub fn new_session_id(secret: &str) -> String {
    let mut salt = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt);
    sign(&hex::encode(salt), secret)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn round_trip_verifies() {
        for payload in ["", "a", "hello world", "with.dots.inside", "héllo"] {
            let token = sign(payload, "secret");
            assert!(verify(&token, "secret"), "payload {:?}", payload);
        }
    }

    #[test]
    fn wrong_secret_fails() {
        let token = sign("payload", "secret");
        assert!(!verify(&token, "other-secret"));
    }

    #[test]
    fn shapeless_tokens_fail() {
        assert!(!verify("", "secret"));
        assert!(!verify("no-separator", "secret"));
        assert!(!verify(".", "secret"));
        assert!(!verify("payload.deadbeef", "secret"));
    }

    #[test]
    fn random_tampering_fails() {
        let mut rng = rand::thread_rng();
        for _ in 0..200 {
            let payload: String = (0..16)
                .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
                .collect();
            let token = sign(&payload, "secret");
            let (head, tail) = token.split_once('.').unwrap();

            // Flip one digest nibble.
            let pos = rng.gen_range(0..tail.len());
            let mut sig: Vec<char> = tail.chars().collect();
            sig[pos] = if sig[pos] == '0' { '1' } else { '0' };
            let tampered = format!("{}.{}", head, sig.into_iter().collect::<String>());
            assert!(!verify(&tampered, "secret"));

            // Swap the payload, keep the digest.
            let forged = format!("{}x.{}", head, tail);
            assert!(!verify(&forged, "secret"));
        }
    }

    #[test]
    fn session_ids_are_unique_and_valid() {
        let a = new_session_id("secret");
        let b = new_session_id("secret");
        assert_ne!(a, b);
        assert!(verify(&a, "secret"));
        assert!(verify(&b, "secret"));
        // 32 random bytes hex-encoded + "." + 32-byte hex digest.
        let (payload, sig) = a.split_once('.').unwrap();
        assert_eq!(payload.len(), 64);
        assert_eq!(sig.len(), 64);
    }
}
