//! Property-based tests for WalletService.
//!
//! - Conservation: a transfer moves exactly its amount between two wallets
//! - Non-negativity: no sequence of operations drives a balance below zero
//! - Audit completeness: every committed mutation writes exactly one entry

use std::sync::Arc;

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::UserId;

use super::cache::ReadCache;
use super::error::WalletError;
use super::memory::InMemoryLedgerStore;
use super::service::{WalletService, WalletServiceConfig};
use super::store::LedgerStore;

/// Strategy to generate non-negative balances (0.00 to 10,000.00).
fn balance() -> impl Strategy<Value = Decimal> {
    (0i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// One engine call in a generated sequence.
#[derive(Debug, Clone)]
enum Op {
    TopUp { user: i64, amount: Decimal },
    Transfer { from: i64, to: i64, amount: Decimal },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (1i64..=3, positive_amount()).prop_map(|(user, amount)| Op::TopUp { user, amount }),
        (1i64..=3, 1i64..=3, positive_amount())
            .prop_map(|(from, to, amount)| Op::Transfer { from, to, amount }),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

async fn seeded(balances: &[Decimal]) -> (Arc<InMemoryLedgerStore>, WalletService<InMemoryLedgerStore>) {
    let store = Arc::new(InMemoryLedgerStore::new());
    for (i, b) in balances.iter().enumerate() {
        let user = i64::try_from(i).unwrap() + 1;
        store.insert_wallet(UserId(user), *b).await.unwrap();
    }
    let service = WalletService::new(
        Arc::clone(&store),
        ReadCache::disabled(),
        WalletServiceConfig::default(),
    );
    (store, service)
}

async fn balance_of(store: &InMemoryLedgerStore, user: i64) -> Decimal {
    store.find_wallet(UserId(user)).await.unwrap().unwrap().balance
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Conservation: sender loses exactly `amount`, receiver gains exactly
    /// `amount`, or nothing changes when funds are insufficient.
    #[test]
    fn prop_transfer_conserves_total(
        a in balance(),
        b in balance(),
        amount in positive_amount(),
    ) {
        let rt = runtime();
        rt.block_on(async {
            let (store, service) = seeded(&[a, b]).await;

            let result = service.transfer(UserId(1), UserId(2), amount).await;
            let after_a = balance_of(&store, 1).await;
            let after_b = balance_of(&store, 2).await;

            prop_assert_eq!(after_a + after_b, a + b);
            if amount <= a {
                let sender = result.unwrap();
                prop_assert_eq!(sender.balance, a - amount);
                prop_assert_eq!(after_a, a - amount);
                prop_assert_eq!(after_b, b + amount);
                prop_assert_eq!(store.entry_count().await, 1);
            } else {
                prop_assert!(
                    matches!(result, Err(WalletError::InsufficientFunds { .. })),
                    "expected InsufficientFunds"
                );
                prop_assert_eq!(after_a, a);
                prop_assert_eq!(after_b, b);
                prop_assert_eq!(store.entry_count().await, 0);
            }
            Ok(())
        })?;
    }

    /// Non-negativity and audit completeness over arbitrary operation sequences.
    #[test]
    fn prop_balances_never_negative(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let rt = runtime();
        rt.block_on(async {
            let (store, service) =
                seeded(&[Decimal::ZERO, Decimal::ZERO, Decimal::ZERO]).await;
            let mut committed = 0usize;
            let mut external_in = Decimal::ZERO;

            for op in ops {
                match op {
                    Op::TopUp { user, amount } => {
                        service.top_up(UserId(user), amount).await.unwrap();
                        committed += 1;
                        external_in += amount;
                    }
                    Op::Transfer { from, to, amount } => {
                        match service.transfer(UserId(from), UserId(to), amount).await {
                            Ok(_) => committed += 1,
                            Err(
                                WalletError::InsufficientFunds { .. }
                                | WalletError::SelfTransfer(_),
                            ) => {}
                            Err(other) => prop_assert!(false, "unexpected error: {}", other),
                        }
                    }
                }

                let mut total = Decimal::ZERO;
                for user in 1..=3 {
                    let b = balance_of(&store, user).await;
                    prop_assert!(b >= Decimal::ZERO, "negative balance {} for user {}", b, user);
                    total += b;
                }
                // Only top-ups bring money into the ledger.
                prop_assert_eq!(total, external_in);
            }

            prop_assert_eq!(store.entry_count().await, committed);
            Ok(())
        })?;
    }
}
