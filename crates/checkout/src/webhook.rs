//! Webhook signature verification and event parsing.
//!
//! The provider signs `"{timestamp}.{raw_body}"` with HMAC-SHA256 under the
//! shared webhook secret and sends the result in a `t=...,v1=...` header.
//! Verification runs before any payload parsing; a tampered or replayed
//! request never reaches order-mutation logic.

use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::{CheckoutError, Result};

/// Header carrying the webhook signature.
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Maximum accepted age of a signed timestamp, in seconds.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

type HmacSha256 = Hmac<Sha256>;

/// Verifies webhook signatures against the provider's shared secret.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    /// Creates a verifier for the given webhook secret.
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Verifies a raw payload against its signature header.
    ///
    /// Rejects malformed headers, timestamps outside the tolerance window
    /// (replay protection), and signature mismatches. The comparison is
    /// constant-time.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<()> {
        let (timestamp, signature_hex) = parse_signature_header(signature_header)?;

        let ts: i64 = timestamp
            .parse()
            .map_err(|_| invalid("malformed timestamp"))?;
        if (Utc::now().timestamp() - ts).abs() > SIGNATURE_TOLERANCE_SECS {
            return Err(invalid("timestamp outside tolerance"));
        }

        let signature = hex::decode(signature_hex).map_err(|_| invalid("malformed signature"))?;

        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|_| invalid("invalid webhook secret"))?;
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        mac.verify_slice(&signature)
            .map_err(|_| invalid("signature mismatch"))
    }
}

fn parse_signature_header(header: &str) -> Result<(&str, &str)> {
    let mut timestamp = None;
    let mut signature = None;
    for part in header.split(',') {
        match part.split_once('=') {
            Some(("t", value)) => timestamp = Some(value),
            Some(("v1", value)) => signature = Some(value),
            _ => {}
        }
    }
    match (timestamp, signature) {
        (Some(t), Some(v1)) => Ok((t, v1)),
        (None, _) => Err(invalid("missing timestamp")),
        (_, None) => Err(invalid("missing signature")),
    }
}

fn invalid(reason: &str) -> CheckoutError {
    CheckoutError::InvalidSignature(reason.to_string())
}

/// A webhook event, parsed only after signature verification.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    /// Event type, e.g. `payment_intent.succeeded`.
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

/// Payload of a webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: WebhookObject,
}

/// The provider object the event refers to.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookObject {
    /// Payment-intent id.
    pub id: String,
}

impl WebhookEvent {
    /// Parses a verified payload.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(payload)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test123secret456";

    fn sign(payload: &[u8], secret: &str, timestamp: &str) -> String {
        let signed_payload = format!("{}.{}", timestamp, String::from_utf8_lossy(payload));
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(signed_payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn header_for(payload: &[u8], secret: &str, timestamp: &str) -> String {
        format!("t={},v1={}", timestamp, sign(payload, secret, timestamp))
    }

    fn now() -> String {
        Utc::now().timestamp().to_string()
    }

    #[test]
    fn valid_signature_is_accepted() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = b"{\"type\":\"payment_intent.succeeded\"}";
        let header = header_for(payload, SECRET, &now());
        assert!(verifier.verify(payload, &header).is_ok());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = b"{\"type\":\"payment_intent.succeeded\"}";
        let header = header_for(payload, "wrong_secret", &now());
        assert!(matches!(
            verifier.verify(payload, &header),
            Err(CheckoutError::InvalidSignature(_))
        ));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let original = b"{\"type\":\"payment_intent.succeeded\"}";
        let tampered = b"{\"type\":\"payment_intent.succeeded\",\"hacked\":true}";
        let header = header_for(original, SECRET, &now());
        assert!(verifier.verify(tampered, &header).is_err());
    }

    #[test]
    fn old_timestamp_is_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = b"{}";
        let stale = (Utc::now().timestamp() - 600).to_string();
        let header = header_for(payload, SECRET, &stale);
        assert!(verifier.verify(payload, &header).is_err());
    }

    #[test]
    fn missing_parts_are_rejected() {
        let verifier = WebhookVerifier::new(SECRET);
        assert!(verifier.verify(b"{}", "v1=deadbeef").is_err());
        assert!(verifier.verify(b"{}", "t=1234567890").is_err());
        assert!(verifier.verify(b"{}", "garbage").is_err());
        assert!(verifier.verify(b"{}", "").is_err());
    }

    #[test]
    fn binary_payloads_verify() {
        let verifier = WebhookVerifier::new(SECRET);
        let payload = &[0x00, 0x01, 0x02, 0xFF, 0xFE, 0xFD];
        let ts = now();
        // Signing uses the raw bytes, not the lossy string.
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(ts.as_bytes());
        mac.update(b".");
        mac.update(payload);
        let header = format!("t={},v1={}", ts, hex::encode(mac.finalize().into_bytes()));
        assert!(verifier.verify(payload, &header).is_ok());
    }

    #[test]
    fn event_parsing_extracts_type_and_intent() {
        let payload = br#"{
            "type": "payment_intent.succeeded",
            "data": { "object": { "id": "pi_0001", "amount": 12000 } }
        }"#;
        let event = WebhookEvent::parse(payload).unwrap();
        assert_eq!(event.event_type, "payment_intent.succeeded");
        assert_eq!(event.data.object.id, "pi_0001");
    }

    #[test]
    fn unparseable_payload_is_an_error() {
        assert!(WebhookEvent::parse(b"not json").is_err());
    }
}
