//! Positive monetary amounts.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! This type wraps `rust_decimal::Decimal` for arbitrary precision.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Decimal places kept by the ledger (`NUMERIC(19, 4)`).
pub const AMOUNT_SCALE: u32 = 4;

/// Why a value was rejected as an [`Amount`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Zero or negative.
    #[error("amount must be greater than zero, got {0}")]
    NonPositive(Decimal),

    /// More fractional digits than the ledger stores.
    #[error("amount {0} has more than {AMOUNT_SCALE} decimal places")]
    TooPrecise(Decimal),

    /// Larger than the ledger can store.
    #[error("amount {0} exceeds the maximum of {max}", max = Amount::MAX)]
    OutOfRange(Decimal),
}

impl AmountError {
    /// The rejected value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        match self {
            Self::NonPositive(v) | Self::TooPrecise(v) | Self::OutOfRange(v) => v,
        }
    }
}

/// A strictly positive monetary amount that fits `NUMERIC(19, 4)`.
///
/// Every balance mutation takes an `Amount`, so the checks happen exactly
/// once, before any store work begins. Values are never rounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    /// Largest storable value, `999999999999999.9999`.
    pub const MAX: Decimal = Decimal::from_parts(0x89E7_FFFF, 0x8AC7_2304, 0, false, AMOUNT_SCALE);

    /// Creates an amount.
    ///
    /// Trailing zeros do not count against the scale, so `1.50000` is valid.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value <= Decimal::ZERO {
            return Err(AmountError::NonPositive(value));
        }
        if value.normalize().scale() > AMOUNT_SCALE {
            return Err(AmountError::TooPrecise(value));
        }
        if value > Self::MAX {
            return Err(AmountError::OutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Returns the underlying decimal value.
    #[must_use]
    pub const fn value(self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
