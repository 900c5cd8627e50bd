//! Shared types and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for users, wallets and transactions
//! - The positive `Amount` money type with decimal precision
//! - Configuration management

pub mod config;
pub mod types;

pub use config::{AppConfig, CacheConfig, DatabaseConfig, ServerConfig};
pub use types::{AMOUNT_SCALE, Amount, AmountError, TransactionId, UserId, WalletId};
