//! Payment settlement.
//!
//! Turns a normalized [`PaymentEvent`] into at most one top-up. The same code
//! path serves every gateway; the plan catalog decides how many credits a
//! payment is worth.

use std::sync::Arc;

use nutri_billing_core::{
    LedgerError, PaymentEvent, PlanCatalog, Result, SettlementRecord, SettlementResult,
};
use nutri_billing_store::SettleOutcome;
use tracing::{debug, error, info};

use crate::Ledger;

/// Applies confirmed payments to the ledger, idempotently per `event_id`.
#[derive(Clone)]
pub struct Settlement {
    ledger: Ledger,
    catalog: Arc<PlanCatalog>,
}

impl Settlement {
    /// Create a settlement adapter.
    #[must_use]
    pub fn new(ledger: Ledger, catalog: Arc<PlanCatalog>) -> Self {
        Self { ledger, catalog }
    }

    /// The plan catalog used to price events.
    #[must_use]
    pub fn catalog(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// Settle one payment event.
    ///
    /// Non-succeeded events are ignored and leave no trace. A redelivered
    /// event returns [`SettlementResult::AlreadyProcessed`].
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if the amount is negative.
    /// - `LedgerError::UnknownPlan` if the plan is not in the catalog.
    /// - `LedgerError::Storage` if the backend fails. Nothing is recorded in
    ///   that case and the event may be retried.
    pub async fn settle(&self, event: &PaymentEvent) -> Result<SettlementResult> {
        if !event.is_succeeded() {
            debug!(
                gateway = %event.gateway,
                event_id = %event.event_id,
                status = ?event.status,
                "Ignoring unconfirmed payment event"
            );
            return Ok(SettlementResult::Ignored);
        }

        if event.amount < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "payment amount must not be negative, got {}",
                event.amount
            )));
        }

        let Some(plan) = self.catalog.get_plan(event.plan_id.as_str()) else {
            error!(
                gateway = %event.gateway,
                event_id = %event.event_id,
                user_id = %event.user_id,
                plan_id = %event.plan_id,
                amount = event.amount,
                "Payment references unknown plan; credits not granted"
            );
            return Err(LedgerError::UnknownPlan {
                plan_id: event.plan_id.to_string(),
            });
        };

        let record = SettlementRecord::from_event(event, plan.credit_count);
        let outcome = self.ledger.settle_topup(&record).await?;

        match outcome {
            SettleOutcome::Duplicate => {
                info!(
                    gateway = %event.gateway,
                    event_id = %event.event_id,
                    user_id = %event.user_id,
                    "Payment already processed"
                );
                Ok(SettlementResult::AlreadyProcessed)
            }
            SettleOutcome::Applied(account) => {
                info!(
                    gateway = %event.gateway,
                    event_id = %event.event_id,
                    user_id = %event.user_id,
                    plan_id = %event.plan_id,
                    amount = event.amount,
                    credits_granted = plan.credit_count,
                    new_balance = account.credits_remaining,
                    "Payment settled"
                );
                Ok(SettlementResult::Applied {
                    new_balance: account.credits_remaining,
                    credits_granted: plan.credit_count,
                })
            }
        }
    }
}
