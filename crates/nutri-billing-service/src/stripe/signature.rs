//! `Stripe-Signature` header verification.
//!
//! Header format: `t=<unix>,v1=<hex>[,v1=<hex>...]`. The signed payload is
//! `"{t}.{body}"` under HMAC-SHA256 with the endpoint secret.

use crate::crypto::{constant_time_eq, hmac_sha256_hex};

use super::StripeError;

/// Maximum age of a signed timestamp, matching Stripe's libraries.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

/// Verify a webhook signature against the current time.
///
/// # Errors
///
/// See [`verify_signature_at`].
pub fn verify_signature(payload: &str, header: &str, secret: &str) -> Result<(), StripeError> {
    verify_signature_at(
        payload,
        header,
        secret,
        SIGNATURE_TOLERANCE_SECS,
        chrono::Utc::now().timestamp(),
    )
}

/// Verify a webhook signature as of `now` (Unix seconds).
///
/// # Errors
///
/// - `StripeError::MalformedHeader` if `t` is missing or not a number, or
///   there is no `v1` entry.
/// - `StripeError::InvalidSignature` if no `v1` entry matches.
/// - `StripeError::TimestampOutOfTolerance` if `t` is more than `tolerance`
///   seconds away from `now`.
pub fn verify_signature_at(
    payload: &str,
    header: &str,
    secret: &str,
    tolerance: i64,
    now: i64,
) -> Result<(), StripeError> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", ts)) => timestamp = Some(ts),
            Some(("v1", sig)) => signatures.push(sig),
            _ => {}
        }
    }

    let timestamp =
        timestamp.ok_or_else(|| StripeError::MalformedHeader("missing timestamp".into()))?;
    let signed_at: i64 = timestamp
        .parse()
        .map_err(|_| StripeError::MalformedHeader(format!("bad timestamp: {timestamp}")))?;

    if signatures.is_empty() {
        return Err(StripeError::MalformedHeader("missing v1 signature".into()));
    }

    let expected = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}"))
        .map_err(|_| StripeError::InvalidSignature)?;

    if !signatures.iter().any(|sig| constant_time_eq(&expected, sig)) {
        return Err(StripeError::InvalidSignature);
    }

    let age = now.saturating_sub(signed_at);
    if age.abs() > tolerance {
        return Err(StripeError::TimestampOutOfTolerance { age });
    }

    Ok(())
}

/// Build a `Stripe-Signature` header for `payload` signed at `timestamp`.
#[must_use]
pub fn sign(payload: &str, secret: &str, timestamp: i64) -> String {
    let sig = hmac_sha256_hex(secret, &format!("{timestamp}.{payload}")).unwrap_or_default();
    format!("t={timestamp},v1={sig}")
}
