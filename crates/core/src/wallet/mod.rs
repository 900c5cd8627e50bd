//! Wallet ledger engine.
//!
//! This module implements the balance-keeping core:
//! - Domain types (wallets, audit entries)
//! - Error taxonomy surfaced to callers
//! - The ledger store seam and an in-memory implementation
//! - A best-effort, time-bounded read cache
//! - The `WalletService` engine enforcing atomicity and non-negative balances

pub mod cache;
pub mod error;
pub mod memory;
pub mod service;
pub mod store;
pub mod types;

#[cfg(test)]
mod service_props;

pub use cache::{CacheBackend, MokaCacheBackend, NoopCacheBackend, ReadCache};
pub use error::{CacheError, StoreError, WalletError};
pub use memory::{Fault, InMemoryLedgerStore};
pub use service::{WalletService, WalletServiceConfig};
pub use store::{LedgerStore, LedgerUnit};
pub use types::{LedgerEntry, NewLedgerEntry, SenderView, TransactionType, Wallet};
