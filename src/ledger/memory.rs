use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{BuyOrder, BuyOutcome, Ledger, Transaction, Wallet, CASH_ASSET};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Default)]
struct Account {
    wallet: Wallet,
    transactions: Vec<Transaction>,
}

/// In-process ledger. One lock guards every account; no await point is held
/// across it.
#[derive(Debug)]
pub struct MemoryLedger {
    initial_usd: f64,
    accounts: Mutex<HashMap<String, Account>>,
}

impl MemoryLedger {
    pub fn new(initial_usd: f64) -> Self {
        Self {
            initial_usd,
            accounts: Mutex::new(HashMap::new()),
        }
    }

    fn with_account<T>(&self, user_id: &str, f: impl FnOnce(&mut Account) -> T) -> Result<T> {
        let mut accounts = self.accounts.lock().map_err(|_| {
            Error::internal_with_context(
                "ledger lock poisoned",
                ErrorContext::new().with_source("memory_ledger"),
            )
        })?;
        let account = accounts.entry(user_id.to_string()).or_insert_with(|| {
            let mut wallet = Wallet::new();
            wallet.insert(CASH_ASSET.to_string(), self.initial_usd);
            Account {
                wallet,
                transactions: Vec::new(),
            }
        });
        Ok(f(account))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(10_000.0)
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn wallet(&self, user_id: &str) -> Result<Wallet> {
        self.with_account(user_id, |a| a.wallet.clone())
    }

    async fn buy(&self, user_id: &str, order: BuyOrder) -> Result<BuyOutcome> {
        self.with_account(user_id, |a| {
            let available = a.wallet.get(CASH_ASSET).copied().unwrap_or(0.0);
            if available < order.usd_amount {
                return BuyOutcome::InsufficientFunds {
                    required: order.usd_amount,
                    available,
                };
            }
            a.wallet
                .insert(CASH_ASSET.to_string(), available - order.usd_amount);
            *a.wallet.entry(order.symbol.clone()).or_insert(0.0) += order.crypto_amount;
            let tx = Transaction {
                kind: "BUY".to_string(),
                symbol: order.symbol,
                amount: order.crypto_amount,
                price: order.price,
                usd_value: order.usd_amount,
                timestamp: chrono::Utc::now().to_rfc3339(),
            };
            a.transactions.push(tx.clone());
            BuyOutcome::Filled(tx)
        })
    }

    async fn transactions(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>> {
        self.with_account(user_id, |a| {
            a.transactions.iter().rev().take(limit).cloned().collect()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn order(usd: f64) -> BuyOrder {
        BuyOrder {
            symbol: "BTC".into(),
            crypto_amount: usd / 50_000.0,
            usd_amount: usd,
            price: 50_000.0,
        }
    }

    #[tokio::test]
    async fn test_new_wallet_is_funded() {
        let ledger = MemoryLedger::new(500.0);
        let wallet = ledger.wallet("alice").await.unwrap();
        assert_eq!(wallet.get(CASH_ASSET), Some(&500.0));
        assert_eq!(wallet.len(), 1);
    }

    #[tokio::test]
    async fn test_buy_moves_funds_and_records() {
        let ledger = MemoryLedger::new(1_000.0);
        let out = ledger.buy("alice", order(100.0)).await.unwrap();
        assert!(matches!(out, BuyOutcome::Filled(ref tx) if tx.kind == "BUY"));

        let wallet = ledger.wallet("alice").await.unwrap();
        assert_eq!(wallet[CASH_ASSET], 900.0);
        assert!((wallet["BTC"] - 0.002).abs() < 1e-12);
        assert_eq!(ledger.transactions("alice", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_funds_mutates_nothing() {
        let ledger = MemoryLedger::new(50.0);
        let out = ledger.buy("alice", order(100.0)).await.unwrap();
        assert_eq!(
            out,
            BuyOutcome::InsufficientFunds {
                required: 100.0,
                available: 50.0
            }
        );
        let wallet = ledger.wallet("alice").await.unwrap();
        assert_eq!(wallet[CASH_ASSET], 50.0);
        assert!(!wallet.contains_key("BTC"));
        assert!(ledger.transactions("alice", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_transactions_newest_first() {
        let ledger = MemoryLedger::new(1_000.0);
        for usd in [10.0, 20.0, 30.0] {
            ledger.buy("alice", order(usd)).await.unwrap();
        }
        let values: Vec<f64> = ledger
            .transactions("alice", 2)
            .await
            .unwrap()
            .iter()
            .map(|t| t.usd_value)
            .collect();
        assert_eq!(values, vec![30.0, 20.0]);
    }

    #[tokio::test]
    async fn test_concurrent_buys_never_overdraw() {
        let ledger = Arc::new(MemoryLedger::new(1_000.0));
        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.buy("alice", order(100.0)).await.unwrap() })
            })
            .collect();
        let mut filled = 0;
        for t in tasks {
            if matches!(t.await.unwrap(), BuyOutcome::Filled(_)) {
                filled += 1;
            }
        }
        assert_eq!(filled, 10);
        assert_eq!(ledger.wallet("alice").await.unwrap()[CASH_ASSET], 0.0);
    }
}
