//! Telegram Payments.
//!
//! The bot issues invoices with payload `credits_<plan_id>_<user_id>` and
//! forwards the `pre_checkout_query` and `successful_payment` updates here.
//! Amounts are already in minor units.

use std::fmt;

use serde::{Deserialize, Serialize};

use nutri_billing_core::{
    EventId, Gateway, IdError, PaymentEvent, PaymentStatus, PlanCatalog, PlanId, UserId,
};

/// Prefix of every credit invoice payload.
pub const PAYLOAD_PREFIX: &str = "credits_";

/// Error type for Telegram payment updates.
#[derive(Debug, thiserror::Error)]
pub enum TelegramError {
    /// Payload is not `credits_<plan_id>_<user_id>`.
    #[error("invalid invoice payload: {0}")]
    InvalidPayload(String),

    /// An identifier in the update is invalid.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),
}

/// Decoded invoice payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoicePayload {
    /// Plan being bought.
    pub plan_id: PlanId,
    /// Buyer.
    pub user_id: UserId,
}

impl InvoicePayload {
    /// Parse `credits_<plan_id>_<user_id>`. The user id is the part after the
    /// last underscore, so plan ids may contain underscores.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError::InvalidPayload` if the prefix or either part is
    /// missing.
    pub fn parse(payload: &str) -> Result<Self, TelegramError> {
        let invalid = || TelegramError::InvalidPayload(payload.to_string());

        let rest = payload.strip_prefix(PAYLOAD_PREFIX).ok_or_else(invalid)?;
        let (plan_id, user_id) = rest.rsplit_once('_').ok_or_else(invalid)?;
        if plan_id.is_empty() || user_id.is_empty() {
            return Err(invalid());
        }

        Ok(Self {
            plan_id: PlanId::new(plan_id)?,
            user_id: UserId::new(user_id)?,
        })
    }
}

impl fmt::Display for InvoicePayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PAYLOAD_PREFIX}{}_{}", self.plan_id, self.user_id)
    }
}

/// Telegram `SuccessfulPayment` object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuccessfulPayment {
    /// ISO 4217 currency code.
    pub currency: String,
    /// Amount in minor units.
    pub total_amount: i64,
    /// Payload set on the invoice.
    pub invoice_payload: String,
    /// Telegram charge id. Unique per charge.
    pub telegram_payment_charge_id: String,
    /// Provider charge id.
    #[serde(default)]
    pub provider_payment_charge_id: Option<String>,
}

impl SuccessfulPayment {
    /// Normalize into a succeeded payment event keyed by the Telegram charge id.
    ///
    /// # Errors
    ///
    /// Returns `TelegramError` if the payload or charge id is invalid.
    pub fn to_payment_event(&self) -> Result<PaymentEvent, TelegramError> {
        let payload = InvoicePayload::parse(&self.invoice_payload)?;
        Ok(PaymentEvent {
            event_id: EventId::new(self.telegram_payment_charge_id.as_str())?,
            user_id: payload.user_id,
            plan_id: payload.plan_id,
            amount: self.total_amount,
            gateway: Gateway::TelegramPayments,
            status: PaymentStatus::Succeeded,
        })
    }
}

/// Telegram `PreCheckoutQuery`, as forwarded by the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    /// Query id, echoed back for the bot's convenience.
    #[serde(default)]
    pub id: Option<String>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Amount in minor units.
    pub total_amount: i64,
    /// Payload set on the invoice.
    pub invoice_payload: String,
}

/// Answer for `answerPreCheckoutQuery`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreCheckoutAnswer {
    /// Query id from the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Whether Telegram may proceed with the charge.
    pub ok: bool,
    /// Reason shown to the user when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl PreCheckoutQuery {
    /// Validate the query against the catalog.
    #[must_use]
    pub fn check(&self, catalog: &PlanCatalog) -> PreCheckoutAnswer {
        let reject = |message: &str| PreCheckoutAnswer {
            id: self.id.clone(),
            ok: false,
            error_message: Some(message.to_string()),
        };

        let Ok(payload) = InvoicePayload::parse(&self.invoice_payload) else {
            return reject("Invalid payment payload");
        };
        let Some(plan) = catalog.get_plan(payload.plan_id.as_str()) else {
            return reject("Unknown plan");
        };
        if self.total_amount != plan.price {
            return reject("Invalid payment amount");
        }
        if !self.currency.eq_ignore_ascii_case(&plan.currency) {
            return reject("Invalid payment currency");
        }

        PreCheckoutAnswer {
            id: self.id.clone(),
            ok: true,
            error_message: None,
        }
    }
}
