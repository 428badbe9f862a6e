//! Stripe webhook signature verification.
//!
//! Stripe signs the raw request body: the `Stripe-Signature` header carries
//! `t=<timestamp>,v1=<hex-hmac>` and the expected digest is
//! `HMAC-SHA256(webhook_secret, "<t>.<raw body>")`. Verification must run
//! against the unparsed bytes, before any JSON handling.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StripeSignature {
    pub timestamp: String,
    pub v1: String,
}

/// Parses a `t=...,v1=...` signature header. Returns `None` when either
/// component is missing.
pub fn parse_stripe_signature(header: &str) -> Option<StripeSignature> {
    let mut timestamp = None;
    let mut v1 = None;

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => timestamp = Some(value.to_string()),
            Some(("v1", value)) => v1 = Some(value.to_string()),
            _ => {}
        }
    }

    Some(StripeSignature {
        timestamp: timestamp?,
        v1: v1?,
    })
}

/// Computes the hex HMAC-SHA256 digest of `"<timestamp>.<body>"`.
pub fn sign_stripe_payload(secret: &str, timestamp: &str, body: &[u8]) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a `Stripe-Signature` header against the raw body using
/// constant-time comparison of the hex digests.
pub fn verify_stripe_signature(secret: &str, header: &str, body: &[u8]) -> bool {
    let Some(sig) = parse_stripe_signature(header) else {
        return false;
    };

    let expected = sign_stripe_payload(secret, &sig.timestamp, body);
    expected.as_bytes().ct_eq(sig.v1.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_fixture";
    const TIMESTAMP: &str = "1712000000";

    fn signed_header(body: &[u8]) -> String {
        format!(
            "t={},v1={}",
            TIMESTAMP,
            sign_stripe_payload(SECRET, TIMESTAMP, body)
        )
    }

    #[test]
    fn test_parse_header() {
        let sig = parse_stripe_signature("t=1712000000,v1=abcdef").unwrap();
        assert_eq!(sig.timestamp, "1712000000");
        assert_eq!(sig.v1, "abcdef");
    }

    #[test]
    fn test_parse_header_missing_v1() {
        assert!(parse_stripe_signature("t=1712000000").is_none());
    }

    #[test]
    fn test_valid_signature_accepted() {
        let body = br#"{"type":"payment_intent.succeeded"}"#;
        assert!(verify_stripe_signature(SECRET, &signed_header(body), body));
    }

    #[test]
    fn test_altered_body_rejected() {
        let body = br#"{"type":"payment_intent.succeeded"}"#;
        let header = signed_header(body);
        let altered = br#"{"type":"payment_intent.payment_failed"}"#;
        assert!(!verify_stripe_signature(SECRET, &header, altered));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let body = br#"{"type":"payment_intent.succeeded"}"#;
        let header = signed_header(body);
        assert!(!verify_stripe_signature("whsec_other", &header, body));
    }
}
