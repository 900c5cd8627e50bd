//! Wallet error types.
//!
//! `WalletError` is what callers of the engine see. Each variant carries a
//! stable code and a retry hint so remote callers can decide whether to try
//! again. `StoreError` and `CacheError` are produced by the two seams.

use rust_decimal::Decimal;
use tally_shared::{AmountError, UserId};
use thiserror::Error;

/// Errors surfaced by the wallet ledger engine.
#[derive(Debug, Error)]
pub enum WalletError {
    /// No wallet exists for the user.
    #[error("Wallet not found for user {0}")]
    NotFound(UserId),

    /// A wallet already exists for the user.
    #[error("Wallet already exists for user {0}")]
    Conflict(UserId),

    /// Amount was not positive, too precise or too large.
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),

    /// Sender balance does not cover the requested amount.
    #[error("Insufficient funds for user {user_id}: balance {balance}, requested {requested}")]
    InsufficientFunds {
        /// The sending user.
        user_id: UserId,
        /// Balance observed under the row lock.
        balance: Decimal,
        /// The requested amount.
        requested: Decimal,
    },

    /// Sender and receiver are the same user.
    #[error("Cannot transfer from user {0} to itself")]
    SelfTransfer(UserId),

    /// The operation deadline elapsed; the unit was rolled back.
    #[error("Operation cancelled before completion")]
    Cancelled,

    /// The persistent store failed.
    #[error("Store failure: {0}")]
    StoreFailure(#[from] StoreError),
}

impl WalletError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InsufficientFunds { .. } => "INSUFFICIENT_FUNDS",
            Self::SelfTransfer(_) => "SELF_TRANSFER",
            Self::Cancelled => "CANCELLED",
            Self::StoreFailure(_) => "STORE_FAILURE",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            // 400 Bad Request - validation errors
            Self::InvalidAmount(_) | Self::SelfTransfer(_) => 400,

            // 404 Not Found
            Self::NotFound(_) => 404,

            // 409 Conflict
            Self::Conflict(_) => 409,

            // 422 Unprocessable - business rule
            Self::InsufficientFunds { .. } => 422,

            // 500 Internal Server Error
            Self::StoreFailure(_) => 500,

            // 504 Gateway Timeout
            Self::Cancelled => 504,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreFailure(_) | Self::Cancelled)
    }
}

/// Errors produced by a ledger store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A unique constraint rejected the write.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// Any other persistence failure, including lock timeouts and lost connections.
    #[error("Database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Create a database error.
    #[must_use]
    pub fn database(msg: impl Into<String>) -> Self {
        Self::Database(msg.into())
    }
}

/// Errors produced by a cache backend. Never returned to engine callers.
#[derive(Debug, Error)]
pub enum CacheError {
    /// The backend could not be reached or refused the command.
    #[error("Cache backend error: {0}")]
    Backend(String),

    /// A snapshot could not be encoded or decoded.
    #[error("Cache serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[rstest]
    #[case(WalletError::NotFound(UserId(1)), "NOT_FOUND")]
    #[case(WalletError::Conflict(UserId(1)), "CONFLICT")]
    #[case(WalletError::InvalidAmount(AmountError::NonPositive(dec!(0))), "INVALID_AMOUNT")]
    #[case(
        WalletError::InsufficientFunds { user_id: UserId(1), balance: dec!(30), requested: dec!(50) },
        "INSUFFICIENT_FUNDS"
    )]
    #[case(WalletError::SelfTransfer(UserId(1)), "SELF_TRANSFER")]
    #[case(WalletError::Cancelled, "CANCELLED")]
    #[case(WalletError::StoreFailure(StoreError::database("down")), "STORE_FAILURE")]
    fn test_error_codes(#[case] error: WalletError, #[case] code: &str) {
        assert_eq!(error.error_code(), code);
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(WalletError::InvalidAmount(AmountError::NonPositive(dec!(-1))).http_status_code(), 400);
        assert_eq!(WalletError::SelfTransfer(UserId(1)).http_status_code(), 400);
        assert_eq!(WalletError::NotFound(UserId(1)).http_status_code(), 404);
        assert_eq!(WalletError::Conflict(UserId(1)).http_status_code(), 409);
        assert_eq!(WalletError::Cancelled.http_status_code(), 504);
        assert_eq!(
            WalletError::StoreFailure(StoreError::database("down")).http_status_code(),
            500
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(WalletError::StoreFailure(StoreError::database("down")).is_retryable());
        assert!(WalletError::Cancelled.is_retryable());
        assert!(
            !WalletError::InsufficientFunds {
                user_id: UserId(1),
                balance: dec!(0),
                requested: dec!(1),
            }
            .is_retryable()
        );
        assert!(!WalletError::InvalidAmount(AmountError::NonPositive(dec!(0))).is_retryable());
        assert!(!WalletError::NotFound(UserId(1)).is_retryable());
        assert!(!WalletError::Conflict(UserId(1)).is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = WalletError::InsufficientFunds {
            user_id: UserId(1),
            balance: dec!(30),
            requested: dec!(50),
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds for user 1: balance 30, requested 50"
        );
    }

    #[test]
    fn test_amount_error_converts() {
        let err: WalletError = AmountError::TooPrecise(dec!(1.00005)).into();
        assert_eq!(err.error_code(), "INVALID_AMOUNT");
        assert_eq!(
            err.to_string(),
            "Invalid amount: amount 1.00005 has more than 4 decimal places"
        );
    }
}
