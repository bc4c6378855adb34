//! Error types for nutri-billing.

use crate::ids::IdError;

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in ledger and settlement operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// Account not found.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Insufficient credits for the operation.
    #[error("insufficient credits: balance={balance}, required={required}")]
    InsufficientCredits {
        /// Current balance.
        balance: i64,
        /// Required credits.
        required: i64,
    },

    /// A payment referenced a plan that is not in the catalog.
    #[error("unknown plan: {plan_id}")]
    UnknownPlan {
        /// The plan ID that could not be resolved.
        plan_id: String,
    },

    /// Account already exists.
    #[error("account already exists: {user_id}")]
    AccountAlreadyExists {
        /// The user ID that already exists.
        user_id: String,
    },

    /// Invalid amount.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    /// Invalid identifier.
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] IdError),

    /// Storage error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LedgerError {
    /// Stable machine-readable code for this error.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AccountNotFound { .. } => "account_not_found",
            Self::InsufficientCredits { .. } => "insufficient_credits",
            Self::UnknownPlan { .. } => "unknown_plan",
            Self::AccountAlreadyExists { .. } => "account_already_exists",
            Self::InvalidAmount(_) => "invalid_amount",
            Self::InvalidId(_) => "invalid_id",
            Self::Storage(_) => "storage_error",
            Self::Configuration(_) => "configuration_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_snake_case() {
        let err = LedgerError::InsufficientCredits {
            balance: 0,
            required: 1,
        };
        assert_eq!(err.code(), "insufficient_credits");
        assert_eq!(
            err.to_string(),
            "insufficient credits: balance=0, required=1"
        );
    }

    #[test]
    fn id_errors_convert() {
        let err: LedgerError = IdError::Empty.into();
        assert_eq!(err.code(), "invalid_id");
    }
}
