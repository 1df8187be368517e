use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{str_arg, usize_arg, GET_CRYPTO_PRICE, GET_ORDERBOOK};
use crate::exchange::ExchangeClient;
use crate::registry::{ToolContext, ToolHandler};
use crate::types::{object, JsonObject, ParamConstraint, ParamSpec, ParamType, StructuredResult, ToolDescriptor};
use crate::Result;

const DEFAULT_DEPTH: usize = 5;

pub(super) fn price_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        GET_CRYPTO_PRICE,
        "Get the real-time price of a cryptocurrency (last, bid, ask, 24h high/low, volume).",
    )
    .param(
        ParamSpec::required("symbol", ParamType::String)
            .with_constraint(ParamConstraint::Symbol)
            .with_description("Trading symbol, e.g. BTC or BTC/USDT"),
    )
}

pub(super) fn orderbook_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        GET_ORDERBOOK,
        "Get the order book (top bids and asks) for a cryptocurrency.",
    )
    .param(
        ParamSpec::required("symbol", ParamType::String)
            .with_constraint(ParamConstraint::Symbol)
            .with_description("Trading symbol, e.g. ETH or ETH/USDT"),
    )
    .param(
        ParamSpec::optional("limit", ParamType::Integer)
            .with_constraint(ParamConstraint::Range { min: 1.0, max: 100.0 })
            .with_default(json!(DEFAULT_DEPTH))
            .with_description("Levels per side"),
    )
}

pub struct PriceHandler {
    exchange: Arc<dyn ExchangeClient>,
}

impl PriceHandler {
    pub fn new(exchange: Arc<dyn ExchangeClient>) -> Self {
        Self { exchange }
    }
}

#[async_trait]
impl ToolHandler for PriceHandler {
    async fn call(&self, ctx: ToolContext, args: JsonObject) -> Result<StructuredResult> {
        let symbol = str_arg(&args, "symbol")?;
        debug!(request_id = ctx.request_id, symbol, "fetching ticker");
        let t = self.exchange.ticker(symbol).await?;
        Ok(StructuredResult::success_with_metadata(
            object(json!({
                "symbol": t.symbol,
                "last": t.last,
                "bid": t.bid,
                "ask": t.ask,
                "high": t.high,
                "low": t.low,
                "volume": t.volume,
            })),
            object(json!({"source": self.exchange.name(), "endpoint": "ticker"})),
        ))
    }
}

pub struct OrderBookHandler {
    exchange: Arc<dyn ExchangeClient>,
}

impl OrderBookHandler {
    pub fn new(exchange: Arc<dyn ExchangeClient>) -> Self {
        Self { exchange }
    }
}

#[async_trait]
impl ToolHandler for OrderBookHandler {
    async fn call(&self, ctx: ToolContext, args: JsonObject) -> Result<StructuredResult> {
        let symbol = str_arg(&args, "symbol")?;
        let limit = usize_arg(&args, "limit", DEFAULT_DEPTH);
        debug!(request_id = ctx.request_id, symbol, limit, "fetching order book");
        let book = self.exchange.order_book(symbol, limit).await?;
        let side = |levels: &[crate::exchange::BookLevel]| {
            levels
                .iter()
                .take(limit)
                .map(|l| json!({"price": l.price, "quantity": l.quantity}))
                .collect::<Vec<_>>()
        };
        Ok(StructuredResult::success_with_metadata(
            object(json!({
                "symbol": book.symbol,
                "asks": side(&book.asks),
                "bids": side(&book.bids),
            })),
            object(json!({
                "source": self.exchange.name(),
                "endpoint": "order_book",
                "limit": limit,
            })),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::StaticExchange;
    use crate::Error;

    fn ctx() -> ToolContext {
        ToolContext {
            user_id: "u".into(),
            request_id: 1,
        }
    }

    #[tokio::test]
    async fn test_price_payload() {
        let handler = PriceHandler::new(Arc::new(StaticExchange::default()));
        let out = handler
            .call(ctx(), object(json!({"symbol": "BTC"})))
            .await
            .unwrap();
        let data = out.data().unwrap();
        assert_eq!(data["symbol"], "BTC/USDT");
        assert_eq!(data["last"], 65_000.0);
        for key in ["bid", "ask", "high", "low", "volume"] {
            assert!(data.contains_key(key), "missing {key}");
        }
    }

    #[tokio::test]
    async fn test_price_unknown_market_propagates_downstream() {
        let handler = PriceHandler::new(Arc::new(StaticExchange::new()));
        let err = handler
            .call(ctx(), object(json!({"symbol": "NOPE"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Downstream { .. }));
    }

    #[tokio::test]
    async fn test_orderbook_respects_limit() {
        let handler = OrderBookHandler::new(Arc::new(StaticExchange::default()));
        let out = handler
            .call(ctx(), object(json!({"symbol": "ETH", "limit": 2})))
            .await
            .unwrap();
        let data = out.data().unwrap();
        assert_eq!(data["asks"].as_array().unwrap().len(), 2);
        assert_eq!(data["bids"].as_array().unwrap().len(), 2);
        assert!(data["asks"][0]["price"].is_number());
    }

    #[test]
    fn test_orderbook_descriptor_defaults() {
        let d = orderbook_descriptor();
        assert_eq!(d.find_param("limit").unwrap().default, Some(json!(5)));
        assert!(d.find_param("symbol").unwrap().required);
    }
}
