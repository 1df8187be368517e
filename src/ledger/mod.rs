//! Simulated wallets and trade records.
//!
//! The buy tool relies on [`Ledger::buy`] being atomic: the affordability
//! check, the USD debit, the asset credit and the transaction record either
//! all happen or none do.

mod memory;

pub use memory::MemoryLedger;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Cash asset every wallet is funded with.
pub const CASH_ASSET: &str = "USD";

/// Asset → balance.
pub type Wallet = BTreeMap<String, f64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(rename = "type")]
    pub kind: String,
    /// Base asset bought.
    pub symbol: String,
    /// Units of `symbol` credited.
    pub amount: f64,
    pub price: f64,
    /// USD debited.
    pub usd_value: f64,
    /// ISO-8601, UTC.
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuyOrder {
    pub symbol: String,
    pub crypto_amount: f64,
    pub usd_amount: f64,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BuyOutcome {
    Filled(Transaction),
    /// Nothing was mutated.
    InsufficientFunds { required: f64, available: f64 },
}

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Current balances; creates a funded wallet on first access.
    async fn wallet(&self, user_id: &str) -> Result<Wallet>;
    async fn buy(&self, user_id: &str, order: BuyOrder) -> Result<BuyOutcome>;
    /// Newest first, at most `limit`.
    async fn transactions(&self, user_id: &str, limit: usize) -> Result<Vec<Transaction>>;
}
