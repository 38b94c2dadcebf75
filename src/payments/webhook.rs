use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing Stripe-Signature header")]
    MissingHeader,
    #[error("malformed Stripe-Signature header")]
    Malformed,
    #[error("timestamp outside the tolerance window")]
    Expired,
    #[error("no signature matches the payload")]
    Mismatch,
}

fn expected_signature(payload: &[u8], secret: &str, timestamp: i64) -> String {
    // HMAC accepts keys of any length, so this cannot fail.
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC can take key of any size"));
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against
/// the raw request body.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> Result<(), SignatureError> {
    let mut timestamp: Option<i64> = None;
    let mut candidates: Vec<&str> = Vec::new();

    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse().map_err(|_| SignatureError::Malformed)?);
            }
            Some(("v1", value)) => candidates.push(value),
            Some(_) => {}
            None => return Err(SignatureError::Malformed),
        }
    }

    let timestamp = timestamp.ok_or(SignatureError::Malformed)?;
    if candidates.is_empty() {
        return Err(SignatureError::Malformed);
    }
    if now.abs_diff(timestamp) > tolerance_secs.unsigned_abs() {
        return Err(SignatureError::Expired);
    }

    let expected = expected_signature(payload, secret, timestamp);
    let matched = candidates
        .iter()
        .any(|candidate| bool::from(candidate.as_bytes().ct_eq(expected.as_bytes())));

    if matched {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Build a header value the way the processor signs its deliveries.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    format!(
        "t={timestamp},v1={}",
        expected_signature(payload, secret, timestamp)
    )
}

// ── Event payloads ──

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

/// The fields of a payment intent the reconciler reads.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub amount_received: i64,
    #[serde(default)]
    pub currency: String,
    pub status: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl PaymentIntentObject {
    pub fn invoice_id(&self) -> Option<Uuid> {
        self.metadata
            .get("invoiceId")
            .and_then(|v| Uuid::parse_str(v).ok())
    }

    pub fn user_id(&self) -> Option<Uuid> {
        self.metadata
            .get("userId")
            .and_then(|v| Uuid::parse_str(v).ok())
    }
}

#[derive(Debug, Clone)]
pub enum PaymentEvent {
    Succeeded(PaymentIntentObject),
    Failed(PaymentIntentObject),
    Created(PaymentIntentObject),
    Other(String),
}

impl WebhookEvent {
    pub fn parse(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn into_payment_event(self) -> Result<PaymentEvent, serde_json::Error> {
        let intent = |object| serde_json::from_value::<PaymentIntentObject>(object);
        Ok(match self.event_type.as_str() {
            "payment_intent.succeeded" => PaymentEvent::Succeeded(intent(self.data.object)?),
            "payment_intent.payment_failed" => PaymentEvent::Failed(intent(self.data.object)?),
            "payment_intent.created" => PaymentEvent::Created(intent(self.data.object)?),
            _ => PaymentEvent::Other(self.event_type),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_740_000_000;

    #[test]
    fn signed_payload_verifies() {
        let body = br#"{"id":"evt_1"}"#;
        let header = sign_payload(body, SECRET, NOW);
        assert_eq!(verify_signature(body, &header, SECRET, 300, NOW + 10), Ok(()));
    }

    #[test]
    fn tampered_body_is_rejected() {
        let header = sign_payload(br#"{"amount":100}"#, SECRET, NOW);
        assert_eq!(
            verify_signature(br#"{"amount":999}"#, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let body = b"{}";
        let header = sign_payload(body, "another_secret", NOW);
        assert_eq!(
            verify_signature(body, &header, SECRET, 300, NOW),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = b"{}";
        let header = sign_payload(body, SECRET, NOW - 301);
        assert_eq!(
            verify_signature(body, &header, SECRET, 300, NOW),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn extreme_timestamps_are_expired() {
        let header = format!("t={},v1=00", i64::MIN);
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, 300, NOW),
            Err(SignatureError::Expired)
        );
        let header = format!("t={},v1=00", i64::MAX);
        assert_eq!(
            verify_signature(b"{}", &header, SECRET, 300, -NOW),
            Err(SignatureError::Expired)
        );
    }

    #[test]
    fn any_matching_v1_is_accepted() {
        let body = b"{}";
        let good = sign_payload(body, SECRET, NOW);
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1=deadbeef,v1={good_sig}");
        assert_eq!(verify_signature(body, &header, SECRET, 300, NOW), Ok(()));
    }

    #[test]
    fn malformed_headers_are_rejected() {
        assert_eq!(
            verify_signature(b"{}", "garbage", SECRET, 300, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(b"{}", "t=abc,v1=00", SECRET, 300, NOW),
            Err(SignatureError::Malformed)
        );
        assert_eq!(
            verify_signature(b"{}", &format!("t={NOW}"), SECRET, 300, NOW),
            Err(SignatureError::Malformed)
        );
    }

    #[test]
    fn succeeded_event_exposes_metadata() {
        let invoice_id = Uuid::new_v4();
        let body = serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.succeeded",
            "data": { "object": {
                "id": "pi_1",
                "amount": 10000,
                "amount_received": 9999,
                "currency": "usd",
                "status": "succeeded",
                "metadata": { "invoiceId": invoice_id.to_string() }
            }}
        });
        let event = WebhookEvent::parse(body.to_string().as_bytes()).unwrap();

        match event.into_payment_event().unwrap() {
            PaymentEvent::Succeeded(intent) => {
                assert_eq!(intent.id, "pi_1");
                assert_eq!(intent.amount_received, 9999);
                assert_eq!(intent.invoice_id(), Some(invoice_id));
                assert_eq!(intent.user_id(), None);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_types_are_passed_through() {
        let body = br#"{"id":"evt_2","type":"charge.refunded","data":{"object":{}}}"#;
        let event = WebhookEvent::parse(body).unwrap();
        assert!(matches!(
            event.into_payment_event().unwrap(),
            PaymentEvent::Other(t) if t == "charge.refunded"
        ));
    }
}
