//! Webhook callback signing (spec §6: `POST /workers/callback` carries an
//! optional `x-webhook-signature` header "compared to a configured
//! secret"). Grounded on `sha2` already being part of the teacher's stack
//! (`brain`'s dependency on it for content hashing); paired here with the
//! standard RustCrypto `hmac` crate rather than hand-rolling HMAC.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Sign `record`'s canonical JSON with `secret`, returning a
/// lowercase-hex-encoded HMAC-SHA256 digest suitable for the
/// `x-webhook-signature` header.
pub fn sign(secret: &str, record: &trailhead_core::JobRecord) -> String {
    let body = serde_json::to_vec(record).unwrap_or_default();
    sign_bytes(secret, &body)
}

/// Sign arbitrary bytes with `secret`.
pub fn sign_bytes(secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify that `signature` matches `secret` over `body`, in constant time.
pub fn verify(secret: &str, body: &[u8], signature: &str) -> bool {
    let expected = sign_bytes(secret, body);
    constant_time_eq(expected.as_bytes(), signature.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sign_is_deterministic() {
        let a = sign_bytes("secret", b"payload");
        let b = sign_bytes("secret", b"payload");
        assert_eq!(a, b);
    }

    #[test]
    fn verify_accepts_matching_signature() {
        let sig = sign_bytes("secret", b"payload");
        assert!(verify("secret", b"payload", &sig));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let sig = sign_bytes("secret", b"payload");
        assert!(!verify("other", b"payload", &sig));
    }

    #[test]
    fn verify_rejects_tampered_body() {
        let sig = sign_bytes("secret", b"payload");
        assert!(!verify("secret", b"tampered", &sig));
    }
}
