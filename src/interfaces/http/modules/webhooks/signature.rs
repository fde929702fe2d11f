//! Provider webhook signature verification
//!
//! Deliveries carry a `Stripe-Signature` header of the form
//! `t=<unix>,v1=<hex mac>[,v1=<hex mac>...]` where each MAC is
//! HMAC-SHA256 over `"{t}.{raw body}"`. The timestamp must fall inside
//! the configured tolerance window before any MAC is compared.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("malformed signature header")]
    Malformed,

    #[error("signature timestamp outside tolerance window")]
    TimestampOutOfTolerance,

    #[error("no signature matched")]
    Mismatch,
}

/// Verify a delivery against the endpoint secret.
///
/// `now` is the verifier's clock as a unix timestamp; passing it in
/// keeps the tolerance check testable.
pub fn verify_signature(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", v)) => timestamp = v.parse().ok(),
            Some(("v1", v)) => candidates.push(v),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }

    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }

    let signed_payload_prefix = format!("{timestamp}.");
    for candidate in candidates {
        let Ok(decoded) = hex::decode(candidate) else {
            continue;
        };
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signed_payload_prefix.as_bytes());
        mac.update(payload);
        // verify_slice is constant-time
        if mac.verify_slice(&decoded).is_ok() {
            return Ok(());
        }
    }

    Err(SignatureError::Mismatch)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";
    const TOLERANCE: i64 = 300;

    fn sign(payload: &[u8], secret: &str, timestamp: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
        mac.update(format!("{timestamp}.").as_bytes());
        mac.update(payload);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(payload, SECRET, now));
        assert_eq!(
            verify_signature(SECRET, &header, payload, TOLERANCE, now),
            Ok(())
        );
    }

    #[test]
    fn wrong_secret_fails() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(payload, "wrong_secret", now));
        assert_eq!(
            verify_signature(SECRET, &header, payload, TOLERANCE, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn tampered_payload_fails() {
        let payload = br#"{"amount":1000}"#;
        let now = 1_700_000_000;
        let header = format!("t={now},v1={}", sign(payload, SECRET, now));
        let tampered = br#"{"amount":9999}"#;
        assert_eq!(
            verify_signature(SECRET, &header, tampered, TOLERANCE, now),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_fails_before_mac_check() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let old = now - 600;
        let header = format!("t={old},v1={}", sign(payload, SECRET, old));
        assert_eq!(
            verify_signature(SECRET, &header, payload, TOLERANCE, now),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn future_timestamp_outside_window_fails() {
        let payload = b"{}";
        let now = 1_700_000_000;
        let future = now + 600;
        let header = format!("t={future},v1={}", sign(payload, SECRET, future));
        assert_eq!(
            verify_signature(SECRET, &header, payload, TOLERANCE, now),
            Err(SignatureError::TimestampOutOfTolerance)
        );
    }

    #[test]
    fn second_v1_candidate_is_accepted() {
        // Secret rotation: the provider signs with old and new secrets.
        let payload = b"{}";
        let now = 1_700_000_000;
        let header = format!(
            "t={now},v1={},v1={}",
            sign(payload, "retired_secret", now),
            sign(payload, SECRET, now)
        );
        assert_eq!(
            verify_signature(SECRET, &header, payload, TOLERANCE, now),
            Ok(())
        );
    }

    #[test]
    fn malformed_headers_rejected() {
        let payload = b"{}";
        let now = 1_700_000_000;
        for header in ["", "v1=abc", "t=notanumber,v1=abc", "t=123"] {
            assert_eq!(
                verify_signature(SECRET, header, payload, TOLERANCE, now),
                Err(SignatureError::Malformed),
                "header {header:?} should be malformed"
            );
        }
    }
}
