//! Wallet ledger engine.
//!
//! Mutations run inside a single store unit: lock, mutate, persist, append
//! the audit row, commit. Any error rolls the whole unit back. Reads are
//! cache-aside against [`ReadCache`].

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tally_shared::{Amount, UserId};
use tracing::{info, instrument, warn};

use super::cache::ReadCache;
use super::error::{StoreError, WalletError};
use super::store::{LedgerStore, LedgerUnit};
use super::types::{LedgerEntry, NewLedgerEntry, SenderView, Wallet};

/// Behavior switches for [`WalletService`].
#[derive(Debug, Clone, Copy)]
pub struct WalletServiceConfig {
    /// Drop the affected users' snapshots after each committed mutation.
    ///
    /// When false, reads within the cache TTL may return pre-mutation data.
    pub invalidate_on_write: bool,
    /// Deadline for a mutation up to its commit, lock waits included.
    ///
    /// The commit itself is never abandoned, so `Cancelled` always means
    /// nothing was written.
    pub operation_timeout: Option<Duration>,
}

impl Default for WalletServiceConfig {
    fn default() -> Self {
        Self {
            invalidate_on_write: true,
            operation_timeout: None,
        }
    }
}

/// Wallet ledger engine.
///
/// Holds no cross-call state besides its injected dependencies and is safe
/// to share between concurrent callers. Row-level consistency is delegated
/// to the store's locks.
pub struct WalletService<S: LedgerStore> {
    store: Arc<S>,
    cache: ReadCache,
    config: WalletServiceConfig,
}

impl<S: LedgerStore> Clone for WalletService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            cache: self.cache.clone(),
            config: self.config,
        }
    }
}

impl<S: LedgerStore> WalletService<S> {
    /// Create a new wallet service.
    #[must_use]
    pub fn new(store: Arc<S>, cache: ReadCache, config: WalletServiceConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Creates the wallet of a user with a zero balance.
    ///
    /// The user is trusted to exist; this layer does not consult the user
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the user already has a wallet.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn create_wallet(&self, user_id: UserId) -> Result<Wallet, WalletError> {
        let wallet = self
            .store
            .create_wallet(user_id)
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => WalletError::Conflict(user_id),
                other => WalletError::StoreFailure(other),
            })?;

        info!(wallet_id = %wallet.id, "Wallet created");
        Ok(wallet)
    }

    /// Adds funds to a wallet and records a `TopUp` entry.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `NotFound`, `Cancelled` or `StoreFailure`.
    #[instrument(skip_all, fields(user_id = %user_id, amount = %amount))]
    pub async fn top_up(&self, user_id: UserId, amount: Decimal) -> Result<Wallet, WalletError> {
        let amount = Amount::new(amount)?;

        let (unit, result) = self
            .with_deadline(async {
                let mut unit = self.store.begin().await?;
                let result = Self::apply_top_up(&mut unit, user_id, amount).await;
                Ok((unit, result))
            })
            .await?;
        let wallet = Self::finish(unit, result).await?;

        info!(balance = %wallet.balance, "Top-up committed");
        self.after_commit(&[user_id]).await;
        Ok(wallet)
    }

    /// Moves funds between two wallets and records one `Transfer` entry.
    ///
    /// Returns the sender's post-transfer view only.
    ///
    /// # Errors
    ///
    /// Returns `InvalidAmount`, `SelfTransfer`, `NotFound`,
    /// `InsufficientFunds`, `Cancelled` or `StoreFailure`. Both balances are
    /// untouched on any error.
    #[instrument(skip_all, fields(from = %from, to = %to, amount = %amount))]
    pub async fn transfer(
        &self,
        from: UserId,
        to: UserId,
        amount: Decimal,
    ) -> Result<SenderView, WalletError> {
        let amount = Amount::new(amount)?;
        if from == to {
            return Err(WalletError::SelfTransfer(from));
        }

        let (unit, result) = self
            .with_deadline(async {
                let mut unit = self.store.begin().await?;
                let result = Self::apply_transfer(&mut unit, from, to, amount).await;
                Ok((unit, result))
            })
            .await?;
        let sender = Self::finish(unit, result).await?;

        info!(sender_balance = %sender.balance, "Transfer committed");
        self.after_commit(&[from, to]).await;
        Ok(SenderView::from(&sender))
    }

    /// Returns a user's wallet, possibly from a snapshot up to the cache TTL old.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `StoreFailure`.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_wallet(&self, user_id: UserId) -> Result<Wallet, WalletError> {
        if let Some(wallet) = self.cache.wallet(user_id).await {
            return Ok(wallet);
        }

        let wallet = self
            .store
            .find_wallet(user_id)
            .await?
            .ok_or(WalletError::NotFound(user_id))?;

        self.cache.put_wallet(&wallet).await;
        Ok(wallet)
    }

    /// Returns every entry the user owns or receives, ascending by id.
    ///
    /// A user without a wallet simply has no entries.
    ///
    /// # Errors
    ///
    /// Returns `StoreFailure`.
    #[instrument(skip_all, fields(user_id = %user_id))]
    pub async fn get_transactions(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, WalletError> {
        if let Some(entries) = self.cache.transactions(user_id).await {
            return Ok(entries);
        }

        let entries = self.store.list_transactions(user_id).await?;

        self.cache.put_transactions(user_id, &entries).await;
        Ok(entries)
    }

    async fn apply_top_up(
        unit: &mut S::Unit,
        user_id: UserId,
        amount: Amount,
    ) -> Result<Wallet, WalletError> {
        let mut wallet = unit
            .lock_wallet(user_id)
            .await?
            .ok_or(WalletError::NotFound(user_id))?;

        wallet.credit(amount)?;
        unit.save_wallet(&wallet).await?;
        unit.append_entry(NewLedgerEntry::top_up(user_id, amount))
            .await?;

        Ok(wallet)
    }

    async fn apply_transfer(
        unit: &mut S::Unit,
        from: UserId,
        to: UserId,
        amount: Amount,
    ) -> Result<Wallet, WalletError> {
        // Lock in ascending user order so opposite transfers cannot deadlock.
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let first_wallet = unit
            .lock_wallet(first)
            .await?
            .ok_or(WalletError::NotFound(first))?;
        let second_wallet = unit
            .lock_wallet(second)
            .await?
            .ok_or(WalletError::NotFound(second))?;
        let (mut sender, mut receiver) = if first == from {
            (first_wallet, second_wallet)
        } else {
            (second_wallet, first_wallet)
        };

        // Funds are checked only now that the sender row is locked.
        sender.debit(amount)?;
        receiver.credit(amount)?;

        unit.save_wallet(&sender).await?;
        unit.save_wallet(&receiver).await?;
        unit.append_entry(NewLedgerEntry::transfer(from, to, amount))
            .await?;

        Ok(sender)
    }

    /// Commits on success, rolls back on failure.
    async fn finish<T>(unit: S::Unit, result: Result<T, WalletError>) -> Result<T, WalletError> {
        match result {
            Ok(value) => {
                unit.commit().await?;
                Ok(value)
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Rolling back unit");
                if let Err(rollback_err) = unit.rollback().await {
                    warn!(error = %rollback_err, "Rollback failed");
                }
                Err(e)
            }
        }
    }

    /// Runs the pre-commit part of a mutation under the configured deadline.
    ///
    /// On expiry the future is dropped, which drops its open unit and rolls
    /// it back.
    async fn with_deadline<T>(
        &self,
        op: impl Future<Output = Result<T, WalletError>>,
    ) -> Result<T, WalletError> {
        match self.config.operation_timeout {
            Some(limit) => tokio::time::timeout(limit, op).await.unwrap_or_else(|_| {
                warn!(timeout = ?limit, "Mutation deadline elapsed");
                Err(WalletError::Cancelled)
            }),
            None => op.await,
        }
    }

    async fn after_commit(&self, users: &[UserId]) {
        if self.config.invalidate_on_write {
            for user_id in users {
                self.cache.invalidate_user(*user_id).await;
            }
        }
    }
}
