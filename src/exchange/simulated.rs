use std::collections::HashMap;

use async_trait::async_trait;

use super::{base_asset, market_pair, BookLevel, ExchangeClient, OrderBook, Ticker};
use crate::{Error, ErrorContext, Result};

const SPREAD: f64 = 0.0005;

/// Exchange with fixed mid prices per base asset.
#[derive(Debug, Clone)]
pub struct StaticExchange {
    prices: HashMap<String, f64>,
}

impl StaticExchange {
    pub fn new() -> Self {
        Self {
            prices: HashMap::new(),
        }
    }

    /// A handful of majors at round prices.
    pub fn with_default_prices() -> Self {
        Self::new()
            .with_price("BTC", 65_000.0)
            .with_price("ETH", 3_200.0)
            .with_price("SOL", 150.0)
            .with_price("BNB", 580.0)
            .with_price("XRP", 0.5)
    }

    pub fn with_price(mut self, base: impl Into<String>, price: f64) -> Self {
        self.prices.insert(base.into().to_uppercase(), price);
        self
    }

    fn mid(&self, symbol: &str) -> Result<(String, f64)> {
        let pair = market_pair(symbol);
        let base = base_asset(&pair);
        self.prices
            .get(base)
            .map(|&p| (pair.clone(), p))
            .ok_or_else(|| {
                Error::downstream_with_context(
                    format!("market {pair} not found"),
                    ErrorContext::new()
                        .with_field_path("symbol")
                        .with_source("static_exchange"),
                )
            })
    }
}

impl Default for StaticExchange {
    fn default() -> Self {
        Self::with_default_prices()
    }
}

#[async_trait]
impl ExchangeClient for StaticExchange {
    async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        let (pair, price) = self.mid(symbol)?;
        Ok(Ticker {
            symbol: pair,
            last: price,
            bid: price * (1.0 - SPREAD),
            ask: price * (1.0 + SPREAD),
            high: price * 1.02,
            low: price * 0.98,
            volume: 1_000.0,
        })
    }

    async fn order_book(&self, symbol: &str, limit: usize) -> Result<OrderBook> {
        let (pair, price) = self.mid(symbol)?;
        let level = |i: usize, sign: f64| BookLevel {
            price: price * (1.0 + sign * SPREAD * (i as f64 + 1.0)),
            quantity: 0.5 * (i as f64 + 1.0),
        };
        Ok(OrderBook {
            symbol: pair,
            bids: (0..limit).map(|i| level(i, -1.0)).collect(),
            asks: (0..limit).map(|i| level(i, 1.0)).collect(),
        })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
