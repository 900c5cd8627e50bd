//! In-memory ledger store.
//!
//! Committed state lives behind a single mutex. Every wallet additionally has
//! its own async row lock, so units touching disjoint wallets proceed in
//! parallel while units touching the same wallet serialize on it. Writes are
//! staged inside the unit and only applied on commit.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::{TransactionId, UserId, WalletId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::error::StoreError;
use super::store::{LedgerStore, LedgerUnit};
use super::types::{LedgerEntry, NewLedgerEntry, Wallet};

/// A one-shot failure to inject into the next unit that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// Fail the wallet save that follows `after` successful saves in a unit.
    SaveWallet {
        /// Number of saves allowed to succeed first.
        after: usize,
    },
    /// Fail the next audit append.
    AppendEntry,
    /// Fail the next commit.
    Commit,
    /// Apply the next commit, then wait this long before acknowledging it.
    SlowCommit(Duration),
}

#[derive(Debug, Default)]
struct State {
    wallets: BTreeMap<UserId, Wallet>,
    row_locks: HashMap<UserId, Arc<Mutex<()>>>,
    entries: Vec<LedgerEntry>,
    next_wallet_id: i64,
    next_entry_id: i64,
}

impl State {
    fn insert_wallet(&mut self, user_id: UserId, balance: Decimal) -> Result<Wallet, StoreError> {
        if self.wallets.contains_key(&user_id) {
            return Err(StoreError::UniqueViolation(format!(
                "wallets.user_id = {user_id}"
            )));
        }
        self.next_wallet_id += 1;
        let wallet = Wallet {
            id: WalletId(self.next_wallet_id),
            user_id,
            balance,
        };
        self.wallets.insert(user_id, wallet.clone());
        self.row_locks.insert(user_id, Arc::new(Mutex::new(())));
        Ok(wallet)
    }
}

/// Ledger store kept entirely in process memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<State>>,
    fault: Arc<Mutex<Option<Fault>>>,
}

impl InMemoryLedgerStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a wallet with an opening balance, bypassing the audit trail.
    ///
    /// Intended for seeding fixtures.
    pub async fn insert_wallet(
        &self,
        user_id: UserId,
        balance: Decimal,
    ) -> Result<Wallet, StoreError> {
        self.state.lock().await.insert_wallet(user_id, balance)
    }

    /// Arms a one-shot fault.
    pub async fn inject(&self, fault: Fault) {
        *self.fault.lock().await = Some(fault);
    }

    /// Number of committed audit rows across all users.
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    async fn take_commit_delay(&self) -> Option<Duration> {
        let mut fault = self.fault.lock().await;
        match *fault {
            Some(Fault::SlowCommit(delay)) => {
                *fault = None;
                Some(delay)
            }
            _ => None,
        }
    }

    async fn take_fault_if(&self, matches: impl FnOnce(Fault) -> bool) -> bool {
        let mut fault = self.fault.lock().await;
        match *fault {
            Some(f) if matches(f) => {
                *fault = None;
                true
            }
            _ => false,
        }
    }
}

impl LedgerStore for InMemoryLedgerStore {
    type Unit = InMemoryUnit;

    async fn begin(&self) -> Result<InMemoryUnit, StoreError> {
        Ok(InMemoryUnit {
            store: self.clone(),
            guards: HashMap::new(),
            staged_wallets: HashMap::new(),
            staged_entries: Vec::new(),
            saves: 0,
        })
    }

    async fn create_wallet(&self, user_id: UserId) -> Result<Wallet, StoreError> {
        self.insert_wallet(user_id, Decimal::ZERO).await
    }

    async fn find_wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        Ok(self.state.lock().await.wallets.get(&user_id).cloned())
    }

    async fn list_transactions(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        Ok(self
            .state
            .lock()
            .await
            .entries
            .iter()
            .filter(|e| e.user_id == user_id || e.counterparty_user_id == Some(user_id))
            .cloned()
            .collect())
    }
}

/// Atomic unit of [`InMemoryLedgerStore`].
#[derive(Debug)]
pub struct InMemoryUnit {
    store: InMemoryLedgerStore,
    guards: HashMap<UserId, OwnedMutexGuard<()>>,
    staged_wallets: HashMap<UserId, Wallet>,
    staged_entries: Vec<NewLedgerEntry>,
    saves: usize,
}

impl LedgerUnit for InMemoryUnit {
    async fn lock_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        if let Some(staged) = self.staged_wallets.get(&user_id) {
            return Ok(Some(staged.clone()));
        }

        if !self.guards.contains_key(&user_id) {
            let row_lock = self.store.state.lock().await.row_locks.get(&user_id).cloned();
            let Some(row_lock) = row_lock else {
                return Ok(None);
            };
            // Wait outside the state mutex so other wallets stay available.
            let guard = row_lock.lock_owned().await;
            self.guards.insert(user_id, guard);
        }

        Ok(self.store.state.lock().await.wallets.get(&user_id).cloned())
    }

    async fn save_wallet(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        if !self.guards.contains_key(&wallet.user_id) {
            return Err(StoreError::database(format!(
                "wallet of user {} is not locked by this unit",
                wallet.user_id
            )));
        }
        let saves = self.saves;
        if self
            .store
            .take_fault_if(|f| f == Fault::SaveWallet { after: saves })
            .await
        {
            return Err(StoreError::database("injected fault: save wallet"));
        }
        self.saves += 1;
        self.staged_wallets.insert(wallet.user_id, wallet.clone());
        Ok(())
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StoreError> {
        if self.store.take_fault_if(|f| f == Fault::AppendEntry).await {
            return Err(StoreError::database("injected fault: append entry"));
        }
        self.staged_entries.push(entry);
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        if self.store.take_fault_if(|f| f == Fault::Commit).await {
            return Err(StoreError::database("injected fault: commit"));
        }
        let ack_delay = self.store.take_commit_delay().await;

        let mut state = self.store.state.lock().await;
        for (user_id, wallet) in self.staged_wallets {
            state.wallets.insert(user_id, wallet);
        }
        let now = Utc::now();
        for entry in self.staged_entries {
            state.next_entry_id += 1;
            let id = TransactionId(state.next_entry_id);
            state.entries.push(LedgerEntry {
                id,
                user_id: entry.user_id,
                counterparty_user_id: entry.counterparty_user_id,
                transaction_type: entry.transaction_type,
                amount: entry.amount.value(),
                created_at: now,
            });
        }
        drop(state);
        drop(self.guards);

        if let Some(delay) = ack_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn rollback(self) -> Result<(), StoreError> {
        Ok(())
    }
}
