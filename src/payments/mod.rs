//! Card payment processing: creating intents and verifying the processor's
//! webhook callbacks.

pub mod stripe;
pub mod webhook;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

pub use stripe::StripeClient;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("payment processor request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payment processor rejected the request ({status}): {message}")]
    Provider { status: u16, message: String },
}

/// What the service asks the processor to charge.
#[derive(Debug, Clone)]
pub struct PaymentIntentRequest {
    /// Amount in minor units (cents).
    pub amount_minor: i64,
    pub currency: String,
    pub invoice_id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: String,
}

/// Seam between invoice logic and the card processor.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_payment_intent(
        &self,
        request: PaymentIntentRequest,
    ) -> Result<PaymentIntent, PaymentError>;
}

/// Convert a major-unit amount to minor units, rounding half away from zero.
pub fn to_minor_units(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

pub fn from_minor_units(amount_minor: i64) -> f64 {
    amount_minor as f64 / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minor_unit_conversion_rounds() {
        assert_eq!(to_minor_units(100.0), 10_000);
        assert_eq!(to_minor_units(19.999), 2_000);
        assert_eq!(to_minor_units(0.1 + 0.2), 30);
    }

    #[test]
    fn received_cents_become_decimal_total() {
        assert_eq!(from_minor_units(9_999), 99.99);
        assert_eq!(from_minor_units(10_000), 100.0);
    }
}
