//! `SeaORM` active enums.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::wallet::TransactionType;

/// Stored form of [`TransactionType`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum TransactionKind {
    #[sea_orm(string_value = "top_up")]
    TopUp,
    #[sea_orm(string_value = "transfer")]
    Transfer,
}

impl From<TransactionType> for TransactionKind {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::TopUp => Self::TopUp,
            TransactionType::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionKind> for TransactionType {
    fn from(value: TransactionKind) -> Self {
        match value {
            TransactionKind::TopUp => Self::TopUp,
            TransactionKind::Transfer => Self::Transfer,
        }
    }
}
