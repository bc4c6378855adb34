//! Account types for nutri-billing.
//!
//! An account is the per-user credit balance. It is created lazily the first
//! time a user is seen and is never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Credits granted to a brand new account.
pub const STARTING_CREDITS: i64 = 3;

/// A credit account for a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// The user ID (Telegram user id).
    pub user_id: UserId,

    /// Analyses the user may still run. Never negative.
    pub credits_remaining: i64,

    /// Lifetime amount paid, in minor currency units (kopecks, cents).
    /// Never decreases.
    pub total_paid: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with the given starting balance.
    #[must_use]
    pub fn new(user_id: UserId, initial_credits: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            credits_remaining: initial_credits,
            total_paid: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the account can pay for `amount` credits.
    #[must_use]
    pub fn has_sufficient_credits(&self, amount: i64) -> bool {
        self.credits_remaining >= amount
    }

    /// Remove `amount` credits from the balance.
    ///
    /// The account is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Negative`] for a negative amount and
    /// [`BalanceError::Insufficient`] if the balance would drop below zero.
    pub fn debit(&mut self, amount: i64) -> Result<(), BalanceError> {
        if amount < 0 {
            return Err(BalanceError::Negative(amount));
        }
        if !self.has_sufficient_credits(amount) {
            return Err(BalanceError::Insufficient {
                balance: self.credits_remaining,
                required: amount,
            });
        }
        self.credits_remaining -= amount;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Add `credits` to the balance and `paid` to the lifetime total.
    ///
    /// The account is left untouched on error.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Negative`] if either input is negative and
    /// [`BalanceError::Overflow`] if a counter would overflow.
    pub fn top_up(&mut self, credits: i64, paid: i64) -> Result<(), BalanceError> {
        if credits < 0 {
            return Err(BalanceError::Negative(credits));
        }
        if paid < 0 {
            return Err(BalanceError::Negative(paid));
        }
        let credits_remaining = self
            .credits_remaining
            .checked_add(credits)
            .ok_or(BalanceError::Overflow)?;
        let total_paid = self
            .total_paid
            .checked_add(paid)
            .ok_or(BalanceError::Overflow)?;

        self.credits_remaining = credits_remaining;
        self.total_paid = total_paid;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the balance outright.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::Negative`] if `credits` is negative.
    pub fn set_credits(&mut self, credits: i64) -> Result<(), BalanceError> {
        if credits < 0 {
            return Err(BalanceError::Negative(credits));
        }
        self.credits_remaining = credits;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// A balance mutation that would break an account invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    /// The balance is too low.
    #[error("insufficient credits: balance={balance}, required={required}")]
    Insufficient {
        /// Current balance.
        balance: i64,
        /// Requested debit.
        required: i64,
    },

    /// A negative amount was supplied.
    #[error("negative amount: {0}")]
    Negative(i64),

    /// A counter would overflow.
    #[error("amount overflow")]
    Overflow,
}
