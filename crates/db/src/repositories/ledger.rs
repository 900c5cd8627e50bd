//! Ledger store backed by `SeaORM`.
//!
//! Each [`SeaOrmUnit`] wraps one database transaction. Row locks are taken
//! with `SELECT ... FOR UPDATE` on backends that support it; `SQLite`
//! serializes writers on its own.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use tally_core::wallet::{
    LedgerEntry, LedgerStore, LedgerUnit, NewLedgerEntry, StoreError, Wallet,
};
use tally_shared::{TransactionId, UserId, WalletId};
use tracing::debug;

use crate::entities::{transactions, wallets};

/// Maps a database error onto the store taxonomy.
fn store_error(err: DbErr) -> StoreError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(msg)) => StoreError::UniqueViolation(msg),
        _ => StoreError::database(err.to_string()),
    }
}

fn to_wallet(model: wallets::Model) -> Wallet {
    Wallet {
        id: WalletId(model.id),
        user_id: UserId(model.user_id),
        balance: model.balance,
    }
}

fn to_entry(model: transactions::Model) -> LedgerEntry {
    LedgerEntry {
        id: TransactionId(model.id),
        user_id: UserId(model.user_id),
        counterparty_user_id: model.counterparty_user_id.map(UserId),
        transaction_type: model.transaction_type.into(),
        amount: model.amount,
        created_at: model.created_at.with_timezone(&chrono::Utc),
    }
}

/// Ledger store over a `SeaORM` connection pool.
#[derive(Debug, Clone)]
pub struct SeaOrmLedgerStore {
    db: DatabaseConnection,
}

impl SeaOrmLedgerStore {
    /// Creates a new ledger store.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Returns the underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl LedgerStore for SeaOrmLedgerStore {
    type Unit = SeaOrmUnit;

    async fn begin(&self) -> Result<SeaOrmUnit, StoreError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(SeaOrmUnit { txn })
    }

    async fn create_wallet(&self, user_id: UserId) -> Result<Wallet, StoreError> {
        let now = chrono::Utc::now().into();

        let wallet = wallets::ActiveModel {
            user_id: Set(user_id.into_inner()),
            balance: Set(rust_decimal::Decimal::ZERO),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = wallet.insert(&self.db).await.map_err(store_error)?;
        Ok(to_wallet(model))
    }

    async fn find_wallet(&self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(store_error)?;
        Ok(model.map(to_wallet))
    }

    async fn list_transactions(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let user = user_id.into_inner();
        let models = transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(transactions::Column::UserId.eq(user))
                    .add(transactions::Column::CounterpartyUserId.eq(user)),
            )
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await
            .map_err(store_error)?;
        Ok(models.into_iter().map(to_entry).collect())
    }
}

/// One database transaction.
///
/// Dropping the unit without committing rolls the transaction back.
pub struct SeaOrmUnit {
    txn: DatabaseTransaction,
}

impl std::fmt::Debug for SeaOrmUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeaOrmUnit").finish_non_exhaustive()
    }
}

impl LedgerUnit for SeaOrmUnit {
    async fn lock_wallet(&mut self, user_id: UserId) -> Result<Option<Wallet>, StoreError> {
        let model = wallets::Entity::find()
            .filter(wallets::Column::UserId.eq(user_id.into_inner()))
            .lock_exclusive()
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        debug!(user_id = %user_id, found = model.is_some(), "Locked wallet row");
        Ok(model.map(to_wallet))
    }

    async fn save_wallet(&mut self, wallet: &Wallet) -> Result<(), StoreError> {
        wallets::ActiveModel {
            id: Set(wallet.id.into_inner()),
            balance: Set(wallet.balance),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .update(&self.txn)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn append_entry(&mut self, entry: NewLedgerEntry) -> Result<(), StoreError> {
        transactions::ActiveModel {
            user_id: Set(entry.user_id.into_inner()),
            counterparty_user_id: Set(entry.counterparty_user_id.map(UserId::into_inner)),
            transaction_type: Set(entry.transaction_type.into()),
            amount: Set(entry.amount.value()),
            created_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .insert(&self.txn)
        .await
        .map_err(store_error)?;
        Ok(())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.txn.commit().await.map_err(store_error)
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.txn.rollback().await.map_err(store_error)
    }
}
