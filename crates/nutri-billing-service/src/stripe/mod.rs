//! Stripe webhook integration.
//!
//! Stripe handles:
//! - One-off credit packs via Checkout
//! - Subscription renewals via `invoice.paid`
//!
//! Nothing here talks to the Stripe API; webhooks carry everything settlement
//! needs.

pub mod events;
pub mod signature;
pub mod types;

pub use events::payment_event;
pub use signature::{verify_signature, verify_signature_at, SIGNATURE_TOLERANCE_SECS};
pub use types::{CheckoutSession, Invoice, StripeEvent};

/// Error type for Stripe webhook processing.
#[derive(Debug, thiserror::Error)]
pub enum StripeError {
    /// The `Stripe-Signature` header could not be parsed.
    #[error("Malformed signature header: {0}")]
    MalformedHeader(String),

    /// No `v1` signature matched the payload.
    #[error("Invalid webhook signature")]
    InvalidSignature,

    /// The signed timestamp is outside the tolerance window.
    #[error("Webhook timestamp outside tolerance: {age}s")]
    TimestampOutOfTolerance {
        /// Seconds between the signed timestamp and now.
        age: i64,
    },

    /// Payload is not a valid Stripe event.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A required field is missing or invalid.
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
}
