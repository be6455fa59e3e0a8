//! Webhook signature schemes.
//!
//! * Paystack signs the raw body with HMAC-SHA512, keyed on the account's secret key, and sends the hex digest in
//!   the `x-paystack-signature` header.
//! * Stripe sends `Stripe-Signature: t=<unix time>,v1=<hex>[,v1=<hex>...]`, where each `v1` value is the hex
//!   HMAC-SHA256 of `"{t}.{body}"` keyed on the endpoint's webhook secret. Deliveries whose timestamp is outside
//!   the tolerance window are rejected.
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};
use thiserror::Error;

pub const PAYSTACK_SIGNATURE_HEADER: &str = "x-paystack-signature";
pub const STRIPE_SIGNATURE_HEADER: &str = "Stripe-Signature";

type HmacSha256 = Hmac<Sha256>;
type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("No signature was provided")]
    MissingSignature,
    #[error("The signature header is malformed: {0}")]
    MalformedHeader(String),
    #[error("The signature header does not contain a timestamp")]
    MissingTimestamp,
    #[error("The signature timestamp is outside the tolerance window")]
    TimestampOutOfTolerance,
    #[error("The signature does not match the payload")]
    InvalidSignature,
    #[error("Invalid signing key")]
    InvalidKey,
}

/// Hex-encoded HMAC-SHA512 of `body`, as Paystack computes it.
pub fn paystack_signature(secret: &str, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

pub fn verify_paystack_signature(secret: &str, body: &[u8], signature: &str) -> Result<(), SignatureError> {
    let signature = signature.trim();
    if signature.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    let expected = hex::decode(signature).map_err(|_| SignatureError::InvalidSignature)?;
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(body);
    mac.verify_slice(&expected).map_err(|_| SignatureError::InvalidSignature)
}

/// Hex-encoded `v1` signature for a Stripe delivery made at `timestamp`.
pub fn stripe_signature(secret: &str, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Checks a `Stripe-Signature` header against `body`. `now` is the current unix time in seconds.
pub fn verify_stripe_signature(
    secret: &str,
    body: &[u8],
    header: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    if header.trim().is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        let (key, value) = part
            .trim()
            .split_once('=')
            .ok_or_else(|| SignatureError::MalformedHeader(format!("'{part}' is not a key=value pair")))?;
        match key {
            "t" => {
                let t = value
                    .parse::<i64>()
                    .map_err(|_| SignatureError::MalformedHeader(format!("'{value}' is not a timestamp")))?;
                timestamp = Some(t);
            },
            "v1" => signatures.push(value),
            // v0 and any future schemes are ignored
            _ => {},
        }
    }
    let timestamp = timestamp.ok_or(SignatureError::MissingTimestamp)?;
    if signatures.is_empty() {
        return Err(SignatureError::MissingSignature);
    }
    if (now - timestamp).abs() > tolerance_secs {
        return Err(SignatureError::TimestampOutOfTolerance);
    }
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::InvalidKey)?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    let matched = signatures
        .into_iter()
        .filter_map(|s| hex::decode(s).ok())
        .any(|s| mac.clone().verify_slice(&s).is_ok());
    if matched {
        Ok(())
    } else {
        Err(SignatureError::InvalidSignature)
    }
}
