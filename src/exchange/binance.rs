use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use super::{market_pair, BookLevel, ExchangeClient, OrderBook, Ticker};
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";

/// Binance public spot market data (no API key).
pub struct BinanceExchange {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Ticker24h {
    last_price: String,
    bid_price: String,
    ask_price: String,
    high_price: String,
    low_price: String,
    volume: String,
}

#[derive(Debug, Deserialize)]
struct Depth {
    bids: Vec<(String, String)>,
    asks: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: i64,
    msg: String,
}

impl BinanceExchange {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid exchange base URL: {e}"),
                ErrorContext::new()
                    .with_field_path("exchange.base_url")
                    .with_details(base_url.to_string()),
            )
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                Error::configuration_with_context(
                    e.to_string(),
                    ErrorContext::new().with_source("binance"),
                )
            })?;
        Ok(Self { client, base_url })
    }

    /// `BTC/USDT` → `BTCUSDT`.
    fn venue_symbol(symbol: &str) -> String {
        market_pair(symbol).replace('/', "")
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url.join(path).map_err(|e| {
            Error::configuration_with_context(
                e.to_string(),
                ErrorContext::new().with_source("binance"),
            )
        })
    }

    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let resp = self.client.get(url).query(query).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiError>(&body)
                .map(|e| format!("{} (code {})", e.msg, e.code))
                .unwrap_or(body);
            return Err(Error::downstream_with_context(
                format!("exchange returned HTTP {}: {}", status.as_u16(), message),
                ErrorContext::new()
                    .with_details(path.to_string())
                    .with_source("binance"),
            ));
        }
        Ok(resp.json::<T>().await?)
    }
}

fn num(field: &str, raw: &str) -> Result<f64> {
    raw.parse::<f64>().map_err(|_| {
        Error::downstream_with_context(
            format!("exchange sent a non-numeric {field}: {raw:?}"),
            ErrorContext::new()
                .with_field_path(field)
                .with_source("binance"),
        )
    })
}

fn levels(side: &str, raw: &[(String, String)]) -> Result<Vec<BookLevel>> {
    raw.iter()
        .map(|(p, q)| {
            Ok(BookLevel {
                price: num(side, p)?,
                quantity: num(side, q)?,
            })
        })
        .collect()
}

#[async_trait]
impl ExchangeClient for BinanceExchange {
    async fn ticker(&self, symbol: &str) -> Result<Ticker> {
        let t: Ticker24h = self
            .get("/api/v3/ticker/24hr", &[("symbol", Self::venue_symbol(symbol))])
            .await?;
        Ok(Ticker {
            symbol: market_pair(symbol),
            last: num("lastPrice", &t.last_price)?,
            bid: num("bidPrice", &t.bid_price)?,
            ask: num("askPrice", &t.ask_price)?,
            high: num("highPrice", &t.high_price)?,
            low: num("lowPrice", &t.low_price)?,
            volume: num("volume", &t.volume)?,
        })
    }

    async fn order_book(&self, symbol: &str, limit: usize) -> Result<OrderBook> {
        let d: Depth = self
            .get(
                "/api/v3/depth",
                &[
                    ("symbol", Self::venue_symbol(symbol)),
                    ("limit", limit.to_string()),
                ],
            )
            .await?;
        let mut bids = levels("bids", &d.bids)?;
        let mut asks = levels("asks", &d.asks)?;
        bids.truncate(limit);
        asks.truncate(limit);
        Ok(OrderBook {
            symbol: market_pair(symbol),
            bids,
            asks,
        })
    }

    fn name(&self) -> &'static str {
        "binance"
    }
}
