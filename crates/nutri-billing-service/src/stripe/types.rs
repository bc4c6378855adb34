//! Stripe webhook payload types.
//!
//! Only the fields settlement reads are modeled; everything else is ignored.

use std::collections::HashMap;

use serde::Deserialize;

/// Stripe event envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    /// Event ID (`evt_...`). Differs between retries of one charge's
    /// notifications, so it is not used for idempotency.
    pub id: String,
    /// Event type.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event data.
    pub data: StripeEventData,
}

/// Stripe event data container.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    /// The object the event is about.
    pub object: serde_json::Value,
}

/// Stripe Checkout session object.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    /// Session ID (`cs_...`).
    pub id: String,
    /// `paid`, `unpaid` or `no_payment_required`.
    #[serde(default)]
    pub payment_status: Option<String>,
    /// Total amount in minor units.
    #[serde(default)]
    pub amount_total: Option<i64>,
    /// Client reference ID (our `user_id`).
    #[serde(default)]
    pub client_reference_id: Option<String>,
    /// Metadata set when the session was created.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl CheckoutSession {
    /// Whether the money has been captured.
    #[must_use]
    pub fn is_paid(&self) -> bool {
        self.payment_status.as_deref() == Some("paid")
    }
}

/// Stripe invoice object.
#[derive(Debug, Clone, Deserialize)]
pub struct Invoice {
    /// Invoice ID (`in_...`).
    pub id: String,
    /// Amount paid in minor units.
    #[serde(default)]
    pub amount_paid: i64,
    /// Why the invoice was created (`subscription_create`,
    /// `subscription_cycle`, ...).
    #[serde(default)]
    pub billing_reason: Option<String>,
    /// Snapshot of the subscription at invoice time.
    #[serde(default)]
    pub subscription_details: Option<SubscriptionDetails>,
    /// Invoice metadata.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

/// Subscription snapshot attached to an invoice.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionDetails {
    /// Subscription metadata.
    #[serde(default)]
    pub metadata: Option<HashMap<String, String>>,
}

impl Invoice {
    /// Whether this is the first invoice of a new subscription. That charge is
    /// already settled through its Checkout session.
    #[must_use]
    pub fn is_subscription_create(&self) -> bool {
        self.billing_reason.as_deref() == Some("subscription_create")
    }

    /// Metadata value, preferring the subscription's metadata.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.subscription_details
            .as_ref()
            .and_then(|d| d.metadata.as_ref())
            .and_then(|m| m.get(key))
            .or_else(|| self.metadata.as_ref().and_then(|m| m.get(key)))
            .map(String::as_str)
    }
}
