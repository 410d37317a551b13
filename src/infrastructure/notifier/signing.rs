//! Webhook payload signing.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the `X-Webhook-Signature` value: lowercase hex HMAC-SHA256 of
/// the exact body bytes, keyed by the owner's shared secret.
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_is_hex_sha256_length() {
        let sig = sign_payload("s3cret", b"{\"event\":\"webhook.test\"}");
        assert_eq!(sig.len(), 64);
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(sig, sig.to_lowercase());
    }

    #[test]
    fn test_signature_is_deterministic() {
        assert_eq!(
            sign_payload("s3cret", b"payload"),
            sign_payload("s3cret", b"payload")
        );
    }

    #[test]
    fn test_signature_depends_on_secret_and_body() {
        assert_ne!(
            sign_payload("secret-a", b"payload"),
            sign_payload("secret-b", b"payload")
        );
        assert_ne!(
            sign_payload("s3cret", b"payload-1"),
            sign_payload("s3cret", b"payload-2")
        );
    }

    #[test]
    fn test_known_vector() {
        // RFC 4231 test case 2: key "Jefe", data "what do ya want for nothing?"
        let sig = sign_payload("Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }
}
