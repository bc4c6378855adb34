//! Request and response types for the nutri-billing API.

use serde::{Deserialize, Serialize};

pub use nutri_billing_core::{
    Account, EventId, Gateway, PaymentEvent, PaymentStatus, Plan, PlanId, SettlementRecord,
    SettlementResult, UserId,
};

/// Get-or-create request.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct CreateAccountRequest<'a> {
    pub user_id: &'a str,
}

/// Account plus whether the call created it.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisteredAccount {
    /// The account.
    pub account: Account,
    /// True only for the call that created the account.
    pub created: bool,
}

/// One page of applied payments.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentsPage {
    /// Applied payments, newest first.
    pub payments: Vec<SettlementRecord>,
    /// Page size the server used.
    pub limit: usize,
    /// Records skipped.
    pub offset: usize,
}

/// Plan catalog response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct PlansResponse {
    pub plans: Vec<Plan>,
}

/// Telegram `SuccessfulPayment`, forwarded as received by the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramPayment {
    /// ISO 4217 currency code.
    pub currency: String,
    /// Amount in minor units.
    pub total_amount: i64,
    /// Invoice payload, `credits_<plan_id>_<user_id>`.
    pub invoice_payload: String,
    /// Telegram charge id.
    pub telegram_payment_charge_id: String,
    /// Provider charge id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_payment_charge_id: Option<String>,
}

/// Telegram `PreCheckoutQuery`, forwarded as received by the bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreCheckoutQuery {
    /// Query id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// ISO 4217 currency code.
    pub currency: String,
    /// Amount in minor units.
    pub total_amount: i64,
    /// Invoice payload.
    pub invoice_payload: String,
}

/// Answer to pass to `answerPreCheckoutQuery`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PreCheckoutAnswer {
    /// Query id echoed back.
    #[serde(default)]
    pub id: Option<String>,
    /// Whether Telegram may charge.
    pub ok: bool,
    /// Reason to show the user when `ok` is false.
    #[serde(default)]
    pub error_message: Option<String>,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorResponse {
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ApiErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    pub(crate) fn detail_i64(&self, key: &str) -> Option<i64> {
        self.details.as_ref()?.get(key)?.as_i64()
    }

    pub(crate) fn detail_str(&self, key: &str) -> Option<&str> {
        self.details.as_ref()?.get(key)?.as_str()
    }
}
