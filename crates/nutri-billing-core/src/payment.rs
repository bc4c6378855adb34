//! Payment types for nutri-billing.
//!
//! Every gateway (Stripe, YooKassa, Telegram Payments) is normalized into a
//! [`PaymentEvent`] before it reaches the ledger. A confirmed event that has
//! been applied leaves behind an immutable [`SettlementRecord`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{EventId, PlanId, UserId};

/// The payment provider that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gateway {
    /// Stripe Checkout and subscriptions.
    Stripe,
    /// YooKassa.
    Yookassa,
    /// Telegram Payments (in-chat invoices).
    TelegramPayments,
}

impl Gateway {
    /// Stable lowercase name, used in storage keys and logs.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
            Self::Yookassa => "yookassa",
            Self::TelegramPayments => "telegram_payments",
        }
    }
}

impl fmt::Display for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gateway {
    type Err = UnknownGateway;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stripe" => Ok(Self::Stripe),
            "yookassa" => Ok(Self::Yookassa),
            "telegram_payments" => Ok(Self::TelegramPayments),
            other => Err(UnknownGateway(other.to_string())),
        }
    }
}

/// A gateway name that is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown gateway: {0}")]
pub struct UnknownGateway(pub String);

/// Gateway-reported state of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Money captured. The only status that moves credits.
    Succeeded,
    /// Charge failed or was cancelled.
    Failed,
    /// Not yet confirmed.
    Pending,
}

/// A normalized payment notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentEvent {
    /// Gateway-assigned id, stable across redeliveries of one charge.
    pub event_id: EventId,

    /// Who paid.
    pub user_id: UserId,

    /// What was bought.
    pub plan_id: PlanId,

    /// Amount paid in minor currency units.
    pub amount: i64,

    /// Where the notification came from.
    pub gateway: Gateway,

    /// Charge state.
    pub status: PaymentStatus,
}

impl PaymentEvent {
    /// Whether the gateway confirmed the charge.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.status == PaymentStatus::Succeeded
    }
}

/// An applied payment. Append-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRecord {
    /// Gateway that reported the charge.
    pub gateway: Gateway,

    /// Gateway event id. Unique together with `gateway`.
    pub event_id: EventId,

    /// Credited user.
    pub user_id: UserId,

    /// Plan purchased.
    pub plan_id: PlanId,

    /// Amount paid in minor currency units.
    pub amount: i64,

    /// Credits added to the balance.
    pub credits_granted: i64,

    /// When the settlement was applied.
    pub processed_at: DateTime<Utc>,
}

impl SettlementRecord {
    /// Record `event` as granting `credits_granted` credits now.
    #[must_use]
    pub fn from_event(event: &PaymentEvent, credits_granted: i64) -> Self {
        Self {
            gateway: event.gateway,
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            plan_id: event.plan_id.clone(),
            amount: event.amount,
            credits_granted,
            processed_at: Utc::now(),
        }
    }
}

/// Outcome of settling a payment event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SettlementResult {
    /// The event was not a confirmed charge. Nothing changed.
    Ignored,

    /// The event was applied before. Nothing changed.
    AlreadyProcessed,

    /// Credits were added.
    Applied {
        /// Balance after the top-up.
        new_balance: i64,
        /// Credits added by this event.
        credits_granted: i64,
    },
}
