//! Domain types for wallets and their audit trail.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::{Amount, AmountError, TransactionId, UserId, WalletId};

use super::error::WalletError;

/// A per-user balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Store-assigned identifier.
    pub id: WalletId,
    /// Owner of the wallet. Exactly one wallet exists per user.
    pub user_id: UserId,
    /// Current balance, never negative after a commit.
    pub balance: Decimal,
}

impl Wallet {
    /// Adds `amount` to the balance.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount` if the new balance would exceed [`Amount::MAX`].
    pub fn credit(&mut self, amount: Amount) -> Result<(), WalletError> {
        let balance = self
            .balance
            .checked_add(amount.value())
            .filter(|b| *b <= Amount::MAX)
            .ok_or(AmountError::OutOfRange(amount.value()))?;
        self.balance = balance;
        Ok(())
    }

    /// Subtracts `amount` from the balance.
    ///
    /// # Errors
    ///
    /// Returns `InsufficientFunds` if the balance would go negative.
    pub fn debit(&mut self, amount: Amount) -> Result<(), WalletError> {
        if self.balance < amount.value() {
            return Err(WalletError::InsufficientFunds {
                user_id: self.user_id,
                balance: self.balance,
                requested: amount.value(),
            });
        }
        self.balance -= amount.value();
        Ok(())
    }
}

/// The sender's view of a wallet after a transfer.
///
/// The receiver's new balance is deliberately not part of the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderView {
    /// Sending user.
    pub user_id: UserId,
    /// Sender balance after the transfer committed.
    pub balance: Decimal,
}

impl From<&Wallet> for SenderView {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id,
            balance: wallet.balance,
        }
    }
}

/// Kind of balance-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionType {
    /// Funds added to a wallet from outside the ledger.
    TopUp,
    /// Funds moved from one wallet to another.
    Transfer,
}

impl TransactionType {
    /// Stable storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TopUp => "top_up",
            Self::Transfer => "transfer",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "top_up" => Ok(Self::TopUp),
            "transfer" => Ok(Self::Transfer),
            _ => Err(format!("Unknown transaction type: {s}")),
        }
    }
}

/// An immutable audit row describing one committed mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Store-assigned identifier.
    pub id: TransactionId,
    /// Wallet owner the entry is recorded against. For transfers, the sender.
    pub user_id: UserId,
    /// Receiving user of a transfer, `None` for top-ups.
    pub counterparty_user_id: Option<UserId>,
    /// Operation that produced the entry.
    pub transaction_type: TransactionType,
    /// Requested amount, always positive.
    pub amount: Decimal,
    /// Commit time as seen by the store.
    pub created_at: DateTime<Utc>,
}

/// An audit row that has not been assigned an identifier yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    /// Owner of the entry.
    pub user_id: UserId,
    /// Receiving user of a transfer.
    pub counterparty_user_id: Option<UserId>,
    /// Operation that produced the entry.
    pub transaction_type: TransactionType,
    /// Requested amount.
    pub amount: Amount,
}

impl NewLedgerEntry {
    /// Entry for a top-up of `user_id`.
    #[must_use]
    pub const fn top_up(user_id: UserId, amount: Amount) -> Self {
        Self {
            user_id,
            counterparty_user_id: None,
            transaction_type: TransactionType::TopUp,
            amount,
        }
    }

    /// Entry for a transfer, owned by the sender.
    #[must_use]
    pub const fn transfer(from: UserId, to: UserId, amount: Amount) -> Self {
        Self {
            user_id: from,
            counterparty_user_id: Some(to),
            transaction_type: TransactionType::Transfer,
            amount,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::str::FromStr;

    fn wallet(balance: Decimal) -> Wallet {
        Wallet {
            id: WalletId(1),
            user_id: UserId(1),
            balance,
        }
    }

    fn amount(value: Decimal) -> Amount {
        Amount::new(value).unwrap()
    }

    #[test]
    fn test_credit_adds_to_balance() {
        let mut w = wallet(dec!(10));
        w.credit(amount(dec!(2.5))).unwrap();
        assert_eq!(w.balance, dec!(12.5));
    }

    #[test]
    fn test_debit_exact_balance_reaches_zero() {
        let mut w = wallet(dec!(30));
        w.debit(amount(dec!(30))).unwrap();
        assert_eq!(w.balance, Decimal::ZERO);
    }

    #[test]
    fn test_debit_over_balance_is_rejected_untouched() {
        let mut w = wallet(dec!(30));
        let err = w.debit(amount(dec!(50))).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InsufficientFunds { balance, requested, .. }
                if balance == dec!(30) && requested == dec!(50)
        ));
        assert_eq!(w.balance, dec!(30));
    }

    #[test]
    fn test_credit_past_column_limit_is_rejected() {
        let mut w = wallet(Amount::MAX - dec!(1));
        w.credit(amount(dec!(1))).unwrap();
        assert_eq!(w.balance, Amount::MAX);

        let err = w.credit(amount(dec!(0.0001))).unwrap_err();
        assert!(matches!(
            err,
            WalletError::InvalidAmount(AmountError::OutOfRange(v)) if v == dec!(0.0001)
        ));
        assert_eq!(w.balance, Amount::MAX);
    }

    #[test]
    fn test_credit_overflow_is_rejected() {
        let mut w = wallet(Decimal::MAX);
        assert!(matches!(
            w.credit(amount(dec!(1))),
            Err(WalletError::InvalidAmount(_))
        ));
        assert_eq!(w.balance, Decimal::MAX);
    }

    #[test]
    fn test_transaction_type_round_trip() {
        for kind in [TransactionType::TopUp, TransactionType::Transfer] {
            assert_eq!(TransactionType::from_str(kind.as_str()).unwrap(), kind);
        }
        assert!(TransactionType::from_str("Top Up").is_err());
    }

    #[test]
    fn test_new_entry_constructors() {
        let top_up = NewLedgerEntry::top_up(UserId(1), amount(dec!(5)));
        assert_eq!(top_up.counterparty_user_id, None);
        assert_eq!(top_up.transaction_type, TransactionType::TopUp);

        let transfer = NewLedgerEntry::transfer(UserId(1), UserId(2), amount(dec!(5)));
        assert_eq!(transfer.user_id, UserId(1));
        assert_eq!(transfer.counterparty_user_id, Some(UserId(2)));
        assert_eq!(transfer.transaction_type, TransactionType::Transfer);
    }
}
