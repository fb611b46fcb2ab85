//! Webhook signature verification using HMAC-SHA256.
//!
//! The tracker signs the raw request body with the shared secret and sends
//! the lowercase hex digest in a signature header, optionally prefixed with
//! `sha256=`. Verification runs before the body is parsed.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Accepted signature header names, in lookup order.
pub const SIGNATURE_HEADERS: [&str; 4] = [
    "Linear-Signature",
    "linear-signature",
    "X-Linear-Signature",
    "x-linear-signature",
];

const PREFIX: &str = "sha256=";

/// Returns the first signature header present on the request.
pub fn signature_header(headers: &HeaderMap) -> Option<&str> {
    SIGNATURE_HEADERS
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|v| v.to_str().ok())
}

/// Computes the lowercase hex HMAC-SHA256 of `payload`.
pub fn compute_signature_hex(secret: &[u8], payload: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC can take key of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Formats a hex digest as a `sha256=`-prefixed header value.
pub fn format_signature_header(hex_digest: &str) -> String {
    format!("{PREFIX}{hex_digest}")
}

/// Verifies a webhook body against the shared secret.
///
/// - No secret configured: verification is disabled and this returns `true`.
/// - Secret configured but no header: `false`.
/// - Otherwise the provided digest (with any `sha256=` prefix removed) must
///   equal the expected lowercase hex digest, compared in constant time.
///
/// Never panics on malformed input.
pub fn verify(secret: Option<&SecretString>, payload: &[u8], provided: Option<&str>) -> bool {
    let Some(secret) = secret else {
        return true;
    };
    let Some(provided) = provided else {
        return false;
    };

    let provided = provided.strip_prefix(PREFIX).unwrap_or(provided);
    let expected = compute_signature_hex(secret.expose_secret().as_bytes(), payload);

    // Slices of different length compare unequal.
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use proptest::prelude::*;

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    #[test]
    fn known_vector() {
        // RFC 4231 test case 2.
        let digest = compute_signature_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            digest,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn accepts_bare_and_prefixed_digest() {
        let s = secret("shh");
        let body = br#"{"type":"Issue"}"#;
        let digest = compute_signature_hex(b"shh", body);

        assert!(verify(Some(&s), body, Some(&digest)));
        assert!(verify(Some(&s), body, Some(&format_signature_header(&digest))));
    }

    #[test]
    fn disabled_without_secret() {
        assert!(verify(None, b"anything", None));
        assert!(verify(None, b"anything", Some("garbage")));
    }

    #[test]
    fn missing_header_fails_when_secret_set() {
        assert!(!verify(Some(&secret("shh")), b"body", None));
    }

    #[test]
    fn malformed_headers_fail() {
        let s = secret("shh");
        for header in ["", "sha256=", "sha256=zz", "sha1=abc", "not-a-signature"] {
            assert!(!verify(Some(&s), b"body", Some(header)), "{header}");
        }
    }

    #[test]
    fn uppercase_digest_is_rejected() {
        let s = secret("shh");
        let digest = compute_signature_hex(b"shh", b"body").to_uppercase();
        assert!(!verify(Some(&s), b"body", Some(&digest)));
    }

    #[test]
    fn wrong_secret_fails() {
        let digest = compute_signature_hex(b"right", b"body");
        assert!(!verify(Some(&secret("wrong")), b"body", Some(&digest)));
    }

    #[test]
    fn header_lookup_accepts_variants() {
        let mut headers = HeaderMap::new();
        assert_eq!(signature_header(&headers), None);

        headers.insert("x-linear-signature", HeaderValue::from_static("abc"));
        assert_eq!(signature_header(&headers), Some("abc"));

        headers.insert("linear-signature", HeaderValue::from_static("def"));
        assert_eq!(signature_header(&headers), Some("def"));
    }

    proptest! {
        #[test]
        fn prop_correct_signature_verifies(secret_str in ".*", body: Vec<u8>, prefixed: bool) {
            let s = SecretString::from(secret_str.clone());
            let digest = compute_signature_hex(secret_str.as_bytes(), &body);
            let header = if prefixed { format_signature_header(&digest) } else { digest };
            prop_assert!(verify(Some(&s), &body, Some(&header)));
        }

        #[test]
        fn prop_single_bit_flip_fails(
            secret_str in ".*",
            body: Vec<u8>,
            index in 0usize..64,
            bit in 0u8..7,
        ) {
            let s = SecretString::from(secret_str.clone());
            let mut digest = compute_signature_hex(secret_str.as_bytes(), &body).into_bytes();
            digest[index] ^= 1 << bit;
            // A flip may produce a non-UTF-8 byte only above bit 6, which is excluded.
            let mutated = String::from_utf8(digest).unwrap();
            prop_assert!(!verify(Some(&s), &body, Some(&mutated)));
        }

        #[test]
        fn prop_never_panics(header: String, body: Vec<u8>, secret_str: String) {
            let s = SecretString::from(secret_str);
            let _ = verify(Some(&s), &body, Some(&header));
        }
    }
}
