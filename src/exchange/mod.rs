//! 行情数据源：交易所客户端接口。
//!
//! Market-data collaborator used by the price, order-book, buy and balance
//! tools. Implementations report every transport or upstream failure as
//! [`Error::Downstream`](crate::Error::Downstream).
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ExchangeClient`] | Trait the handlers depend on |
//! | [`BinanceExchange`] | Public Binance spot REST endpoints over `reqwest` |
//! | [`StaticExchange`] | Fixed prices, no network (tests, offline demos) |

mod binance;
mod simulated;

pub use binance::{BinanceExchange, DEFAULT_BASE_URL};
pub use simulated::StaticExchange;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

/// Quote asset assumed when a symbol names only the base (`BTC` → `BTC/USDT`).
pub const DEFAULT_QUOTE: &str = "USDT";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticker {
    pub symbol: String,
    pub last: f64,
    pub bid: f64,
    pub ask: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BookLevel {
    pub price: f64,
    pub quantity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderBook {
    pub symbol: String,
    pub bids: Vec<BookLevel>,
    pub asks: Vec<BookLevel>,
}

#[async_trait]
pub trait ExchangeClient: Send + Sync {
    /// 24h ticker for a normalized symbol (`BTC` or `BTC/USDT`).
    async fn ticker(&self, symbol: &str) -> Result<Ticker>;
    /// Top `limit` levels per side.
    async fn order_book(&self, symbol: &str, limit: usize) -> Result<OrderBook>;
    fn name(&self) -> &'static str;
}

/// `BTC` → `BTC/USDT`; pairs pass through.
pub fn market_pair(symbol: &str) -> String {
    if symbol.contains('/') {
        symbol.to_string()
    } else {
        format!("{symbol}/{DEFAULT_QUOTE}")
    }
}

/// `BTC/USDT` → `BTC`.
pub fn base_asset(symbol: &str) -> &str {
    symbol.split('/').next().unwrap_or(symbol)
}
