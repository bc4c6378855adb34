//! Error types for nutri-billing storage.

use nutri_billing_core::{BalanceError, LedgerError, UserId};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Record not found.
    #[error("not found")]
    NotFound,

    /// Record already exists.
    #[error("already exists")]
    AlreadyExists,

    /// Insufficient credits for deduction.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required credits.
        required: i64,
    },

    /// A write would break an account invariant.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

impl StoreError {
    /// Convert into a ledger error, attributing `NotFound` and
    /// `AlreadyExists` to `user_id`.
    #[must_use]
    pub fn for_user(self, user_id: &UserId) -> LedgerError {
        match self {
            Self::NotFound => LedgerError::AccountNotFound {
                user_id: user_id.to_string(),
            },
            Self::AlreadyExists => LedgerError::AccountAlreadyExists {
                user_id: user_id.to_string(),
            },
            other => other.into(),
        }
    }
}

impl From<BalanceError> for StoreError {
    fn from(err: BalanceError) -> Self {
        match err {
            BalanceError::Insufficient { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            other => Self::InvalidValue(other.to_string()),
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
            StoreError::InvalidValue(msg) => Self::InvalidAmount(msg),
            StoreError::NotFound => Self::Storage("record not found".to_string()),
            StoreError::AlreadyExists => Self::Storage("record already exists".to_string()),
            StoreError::Database(msg) | StoreError::Serialization(msg) => Self::Storage(msg),
        }
    }
}
