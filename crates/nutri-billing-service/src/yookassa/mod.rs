//! YooKassa integration.
//!
//! YooKassa notifications are unsigned. When shop credentials are configured
//! the payment is fetched back from the API and that copy is trusted instead
//! of the notification body.

pub mod amount;
pub mod client;
pub mod types;

pub use amount::parse_minor_units;
pub use client::YookassaClient;
pub use types::{Notification, PaymentAmount, YookassaPayment};

use nutri_billing_core::{EventId, Gateway, PaymentEvent, PaymentStatus, PlanId, UserId};

/// Error type for YooKassa operations.
#[derive(Debug, thiserror::Error)]
pub enum YookassaError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// YooKassa API returned an error.
    #[error("YooKassa API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description from the response body.
        message: String,
    },

    /// Amount string is not a valid decimal with at most two fraction digits.
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// A required field is missing or invalid.
    #[error("Invalid payment: {0}")]
    InvalidPayment(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Normalize a YooKassa payment object.
///
/// The status comes from the payment itself: `succeeded` → succeeded,
/// `canceled` → failed, anything else → pending.
///
/// # Errors
///
/// Returns `YookassaError::InvalidPayment` if `user_id` or `plan_id` is
/// missing from the metadata, and `YookassaError::InvalidAmount` if the amount
/// does not convert exactly.
pub fn payment_event(payment: &YookassaPayment) -> Result<PaymentEvent, YookassaError> {
    let user_id = payment
        .metadata_str("user_id")
        .ok_or_else(|| missing(&payment.id, "user_id"))?;
    let plan_id = payment
        .metadata_str("plan_id")
        .ok_or_else(|| missing(&payment.id, "plan_id"))?;
    let amount = parse_minor_units(&payment.amount.value)?;

    let status = match payment.status.as_str() {
        "succeeded" => PaymentStatus::Succeeded,
        "canceled" => PaymentStatus::Failed,
        _ => PaymentStatus::Pending,
    };

    let invalid =
        |e: nutri_billing_core::IdError| YookassaError::InvalidPayment(format!("{}: {e}", payment.id));

    Ok(PaymentEvent {
        event_id: EventId::new(payment.id.as_str()).map_err(invalid)?,
        user_id: UserId::new(user_id).map_err(invalid)?,
        plan_id: PlanId::new(plan_id).map_err(invalid)?,
        amount,
        gateway: Gateway::Yookassa,
        status,
    })
}

fn missing(payment_id: &str, field: &str) -> YookassaError {
    YookassaError::InvalidPayment(format!("{payment_id}: missing metadata.{field}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payment(status: &str, metadata: serde_json::Value) -> YookassaPayment {
        serde_json::from_value(json!({
            "id": "2c5d3f1a-000f-5000-9000-1b2c3d4e5f60",
            "status": status,
            "paid": status == "succeeded",
            "amount": { "value": "99.00", "currency": "RUB" },
            "metadata": metadata
        }))
        .unwrap()
    }

    #[test]
    fn succeeded_payment_normalizes() {
        let p = payment(
            "succeeded",
            json!({ "user_id": "123456789", "plan_id": "basic", "credits_count": "20" }),
        );
        let e = payment_event(&p).unwrap();
        assert_eq!(e.event_id.as_str(), "2c5d3f1a-000f-5000-9000-1b2c3d4e5f60");
        assert_eq!(e.user_id.as_str(), "123456789");
        assert_eq!(e.plan_id.as_str(), "basic");
        assert_eq!(e.amount, 9900);
        assert_eq!(e.gateway, Gateway::Yookassa);
        assert_eq!(e.status, PaymentStatus::Succeeded);
    }

    #[test]
    fn statuses_map() {
        let meta = json!({ "user_id": "1", "plan_id": "basic" });
        for (status, expected) in [
            ("canceled", PaymentStatus::Failed),
            ("pending", PaymentStatus::Pending),
            ("waiting_for_capture", PaymentStatus::Pending),
        ] {
            let e = payment_event(&payment(status, meta.clone())).unwrap();
            assert_eq!(e.status, expected, "{status}");
        }
    }

    #[test]
    fn numeric_user_id_is_accepted() {
        let p = payment("succeeded", json!({ "user_id": 123_456_789, "plan_id": "pro" }));
        assert_eq!(payment_event(&p).unwrap().user_id.as_str(), "123456789");
    }

    #[test]
    fn missing_metadata_is_invalid() {
        let p = payment("succeeded", json!({ "plan_id": "basic" }));
        let err = payment_event(&p).unwrap_err();
        assert!(matches!(err, YookassaError::InvalidPayment(msg) if msg.contains("user_id")));
    }
}
