//! Ledger store seam.
//!
//! These traits are implemented by the db crate to provide actual database
//! operations, and by [`super::memory::InMemoryLedgerStore`] for tests.

use std::future::Future;

use tally_shared::UserId;

use super::error::StoreError;
use super::types::{LedgerEntry, NewLedgerEntry, Wallet};

/// Durable storage for wallets and ledger entries.
pub trait LedgerStore: Send + Sync {
    /// Atomic unit type opened by [`LedgerStore::begin`].
    type Unit: LedgerUnit;

    /// Opens a new atomic unit.
    fn begin(&self) -> impl Future<Output = Result<Self::Unit, StoreError>> + Send;

    /// Inserts a wallet with a zero balance.
    ///
    /// Fails with `StoreError::UniqueViolation` if the user already has one.
    fn create_wallet(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Wallet, StoreError>> + Send;

    /// Reads the committed wallet of a user.
    fn find_wallet(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Wallet>, StoreError>> + Send;

    /// Lists every committed entry the user owns or receives, ascending by id.
    fn list_transactions(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<LedgerEntry>, StoreError>> + Send;
}

/// A group of store operations that commit or roll back together.
///
/// Dropping a unit without calling [`LedgerUnit::commit`] rolls it back.
pub trait LedgerUnit: Send {
    /// Loads a wallet and holds its row lock until the unit ends.
    fn lock_wallet(
        &mut self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Option<Wallet>, StoreError>> + Send;

    /// Persists the balance of a wallet previously locked in this unit.
    fn save_wallet(
        &mut self,
        wallet: &Wallet,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends an audit row.
    fn append_entry(
        &mut self,
        entry: NewLedgerEntry,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Makes every write of the unit visible and releases its locks.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Discards every write of the unit and releases its locks.
    fn rollback(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
