//! YooKassa API types.

use std::collections::HashMap;

use serde::Deserialize;

/// HTTP notification body.
#[derive(Debug, Clone, Deserialize)]
pub struct Notification {
    /// Always `notification`.
    #[serde(rename = "type", default)]
    pub notification_type: Option<String>,
    /// Event name, e.g. `payment.succeeded`.
    pub event: String,
    /// The payment the event is about.
    pub object: YookassaPayment,
}

impl Notification {
    /// Whether the event concerns a payment (not a refund or payout).
    #[must_use]
    pub fn is_payment_event(&self) -> bool {
        self.event.starts_with("payment.")
    }
}

/// YooKassa payment object.
#[derive(Debug, Clone, Deserialize)]
pub struct YookassaPayment {
    /// Payment ID.
    pub id: String,
    /// `pending`, `waiting_for_capture`, `succeeded` or `canceled`.
    pub status: String,
    /// Whether the payment has been paid.
    #[serde(default)]
    pub paid: bool,
    /// Payment amount.
    pub amount: PaymentAmount,
    /// Metadata set when the payment was created.
    #[serde(default)]
    pub metadata: Option<HashMap<String, serde_json::Value>>,
}

impl YookassaPayment {
    /// Metadata value as a string. Numbers are rendered in decimal.
    #[must_use]
    pub fn metadata_str(&self, key: &str) -> Option<String> {
        match self.metadata.as_ref()?.get(key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// Amount with currency.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentAmount {
    /// Decimal string, e.g. `"99.00"`.
    pub value: String,
    /// ISO 4217 currency code.
    pub currency: String,
}

/// Error body returned by the YooKassa API.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}
