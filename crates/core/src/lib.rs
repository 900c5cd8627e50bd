//! Core business logic for Tally.
//!
//! This crate contains the wallet ledger engine with ZERO web or database
//! dependencies. Persistence and caching are reached only through the
//! traits in [`wallet::store`] and [`wallet::cache`].
//!
//! # Modules
//!
//! - `wallet` - Balances, transfers, audit trail and cached reads

pub mod wallet;
