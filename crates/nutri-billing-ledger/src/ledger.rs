//! The ledger engine.
//!
//! Every change to `credits_remaining` goes through [`Ledger`]. It keeps no
//! balances in memory: each operation is one atomic store call, and the store
//! serializes concurrent writers to the same account.

use std::sync::Arc;

use nutri_billing_core::{
    Account, LedgerError, Result, SettlementRecord, UserId, STARTING_CREDITS,
};
use nutri_billing_store::{SettleOutcome, Store};
use tracing::{debug, info, warn};

/// Credits taken by one analysis.
const DEBIT_AMOUNT: i64 = 1;

/// Single choke point for balance mutation.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
    starting_credits: i64,
}

impl Ledger {
    /// Create a ledger over `store` with the default starting grant.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            starting_credits: STARTING_CREDITS,
        }
    }

    /// Override the credits given to new accounts.
    #[must_use]
    pub fn with_starting_credits(mut self, starting_credits: i64) -> Self {
        self.starting_credits = starting_credits;
        self
    }

    /// Credits given to new accounts.
    #[must_use]
    pub fn starting_credits(&self) -> i64 {
        self.starting_credits
    }

    /// The storage backend.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    /// Return the user's account, creating it with the starting grant if new.
    ///
    /// Exactly one of any number of concurrent callers sees `created = true`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the backend fails.
    pub async fn get_or_create(&self, user_id: &UserId) -> Result<(Account, bool)> {
        let (account, created) = self
            .store
            .get_or_create_account(user_id, self.starting_credits)
            .await
            .map_err(|e| e.for_user(user_id))?;

        if created {
            info!(
                user_id = %user_id,
                credits = account.credits_remaining,
                "New account granted starting credits"
            );
        }
        Ok((account, created))
    }

    /// Read an account.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::AccountNotFound` if the user was never seen.
    pub async fn account(&self, user_id: &UserId) -> Result<Account> {
        self.store
            .get_account(user_id)
            .await
            .map_err(|e| e.for_user(user_id))?
            .ok_or_else(|| LedgerError::AccountNotFound {
                user_id: user_id.to_string(),
            })
    }

    /// Spend one credit.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InsufficientCredits` if the balance is zero.
    /// - `LedgerError::AccountNotFound` if the user was never seen.
    pub async fn debit_one(&self, user_id: &UserId) -> Result<Account> {
        let account = self
            .store
            .debit_credits(user_id, DEBIT_AMOUNT)
            .await
            .map_err(|e| e.for_user(user_id))?;

        debug!(
            user_id = %user_id,
            credits_remaining = account.credits_remaining,
            "Credit debited"
        );
        Ok(account)
    }

    /// Add purchased credits and the amount paid for them.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `credit_count` is not positive or
    ///   `paid_amount` is negative.
    /// - `LedgerError::AccountNotFound` if the user was never seen.
    pub async fn credit_topup(
        &self,
        user_id: &UserId,
        credit_count: i64,
        paid_amount: i64,
    ) -> Result<Account> {
        if credit_count <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "credit count must be positive, got {credit_count}"
            )));
        }
        if paid_amount < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "paid amount must not be negative, got {paid_amount}"
            )));
        }

        let account = self
            .store
            .top_up(user_id, credit_count, paid_amount)
            .await
            .map_err(|e| e.for_user(user_id))?;

        info!(
            user_id = %user_id,
            credit_count,
            paid_amount,
            new_balance = account.credits_remaining,
            "Credits topped up"
        );
        Ok(account)
    }

    /// Record a settlement and apply its top-up in one atomic step.
    ///
    /// Creates the account with the starting grant if the user was never
    /// seen. Returns `SettleOutcome::Duplicate`, leaving the balance alone,
    /// if the record's `event_id` was applied before.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if the record grants no credits or
    ///   carries a negative amount.
    /// - `LedgerError::Storage` if the backend fails.
    pub async fn settle_topup(&self, record: &SettlementRecord) -> Result<SettleOutcome> {
        if record.credits_granted <= 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "credit count must be positive, got {}",
                record.credits_granted
            )));
        }
        if record.amount < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "paid amount must not be negative, got {}",
                record.amount
            )));
        }

        let outcome = self
            .store
            .settle_payment(record, self.starting_credits)
            .await?;

        if let SettleOutcome::Applied(account) = &outcome {
            debug!(
                user_id = %record.user_id,
                event_id = %record.event_id,
                new_balance = account.credits_remaining,
                "Settlement top-up applied"
            );
        }
        Ok(outcome)
    }

    /// Grant free credits (promotions, support).
    ///
    /// # Errors
    ///
    /// Same as [`Ledger::credit_topup`].
    pub async fn grant(&self, user_id: &UserId, credit_count: i64) -> Result<Account> {
        self.credit_topup(user_id, credit_count, 0).await
    }

    /// Overwrite the balance. Operator use only.
    ///
    /// # Errors
    ///
    /// - `LedgerError::InvalidAmount` if `new_value` is negative.
    /// - `LedgerError::AccountNotFound` if the user was never seen.
    pub async fn correct_balance(&self, user_id: &UserId, new_value: i64) -> Result<Account> {
        if new_value < 0 {
            return Err(LedgerError::InvalidAmount(format!(
                "balance must not be negative, got {new_value}"
            )));
        }

        let account = self
            .store
            .update_credits(user_id, new_value)
            .await
            .map_err(|e| e.for_user(user_id))?;

        warn!(user_id = %user_id, new_value, "Balance corrected by operator");
        Ok(account)
    }

    /// Applied payments for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Storage` if the backend fails.
    pub async fn payment_history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<SettlementRecord>> {
        Ok(self
            .store
            .list_settlements_by_user(user_id, limit, offset)
            .await?)
    }
}
