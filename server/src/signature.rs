//! Webhook payload authentication.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Verify a `X-Hub-Signature-256` style header against the raw request
/// body: `sha256=` followed by the hex HMAC-SHA256 of the body keyed by the
/// shared secret. Malformed headers are a verification failure, not an
/// error; the digest comparison is constant-time.
pub fn verify(secret: &str, body: &[u8], signature_header: &str) -> bool {
    let Some(hex_digest) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(digest) = hex::decode(hex_digest) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&digest).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("hmac key");
        mac.update(body);
        format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
    }

    #[test]
    fn accepts_a_correctly_signed_body() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("secret", body);
        assert!(verify("secret", body, &header));
    }

    #[test]
    fn rejects_a_mutated_body() {
        let body = br#"{"ref":"refs/heads/main"}"#;
        let header = sign("secret", body);
        let mut tampered = body.to_vec();
        tampered[0] ^= 1;
        assert!(!verify("secret", &tampered, &header));
    }

    #[test]
    fn rejects_a_mutated_signature() {
        let body = b"payload";
        let mut header = sign("secret", body);
        // Flip the last hex digit.
        let last = header.pop().expect("nonempty");
        header.push(if last == '0' { '1' } else { '0' });
        assert!(!verify("secret", body, &header));
    }

    #[test]
    fn rejects_the_wrong_secret() {
        let body = b"payload";
        let header = sign("secret", body);
        assert!(!verify("other", body, &header));
    }

    #[test]
    fn rejects_malformed_headers() {
        let body = b"payload";
        assert!(!verify("secret", body, ""));
        assert!(!verify("secret", body, "sha1=abcdef"));
        assert!(!verify("secret", body, "sha256"));
        assert!(!verify("secret", body, "sha256=not-hex"));
    }
}
