use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value};
use tracing::debug;

use super::{usize_arg, CHECK_BALANCE, TRANSACTION_HISTORY};
use crate::exchange::{market_pair, ExchangeClient};
use crate::ledger::{Ledger, CASH_ASSET};
use crate::registry::{ToolContext, ToolHandler};
use crate::types::{object, JsonObject, ParamConstraint, ParamSpec, ParamType, StructuredResult, ToolDescriptor};
use crate::Result;

const DEFAULT_HISTORY_LIMIT: usize = 10;

pub(super) fn balance_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        CHECK_BALANCE,
        "Check the simulated wallet: every held asset with its USD value.",
    )
}

pub(super) fn history_descriptor() -> ToolDescriptor {
    ToolDescriptor::new(
        TRANSACTION_HISTORY,
        "List recent simulated trades, newest first.",
    )
    .param(
        ParamSpec::optional("limit", ParamType::Integer)
            .with_constraint(ParamConstraint::Range { min: 1.0, max: 100.0 })
            .with_default(json!(DEFAULT_HISTORY_LIMIT))
            .with_description("Maximum number of transactions"),
    )
}

pub struct BalanceHandler {
    exchange: Arc<dyn ExchangeClient>,
    ledger: Arc<dyn Ledger>,
}

impl BalanceHandler {
    pub fn new(exchange: Arc<dyn ExchangeClient>, ledger: Arc<dyn Ledger>) -> Self {
        Self { exchange, ledger }
    }
}

#[async_trait]
impl ToolHandler for BalanceHandler {
    async fn call(&self, ctx: ToolContext, _args: JsonObject) -> Result<StructuredResult> {
        let wallet = self.ledger.wallet(&ctx.user_id).await?;
        let cash = wallet.get(CASH_ASSET).copied().unwrap_or(0.0);

        let mut total_usd = cash;
        let mut assets = Vec::with_capacity(wallet.len());
        if cash > 0.0 {
            assets.push(json!({"asset": CASH_ASSET, "balance": cash, "usd_value": cash}));
        }
        let held: Vec<(&String, f64)> = wallet
            .iter()
            .filter(|(a, &b)| a.as_str() != CASH_ASSET && b > 0.0)
            .map(|(a, &b)| (a, b))
            .collect();
        let pairs: Vec<String> = held.iter().map(|(a, _)| market_pair(a)).collect();
        let quotes = join_all(pairs.iter().map(|p| self.exchange.ticker(p))).await;

        for ((asset, balance), quote) in held.into_iter().zip(quotes) {
            // Unpriced assets are still listed, without a value.
            match quote {
                Ok(t) => {
                    let usd_value = balance * t.last;
                    total_usd += usd_value;
                    assets.push(json!({
                        "asset": asset,
                        "balance": balance,
                        "price": t.last,
                        "usd_value": usd_value,
                    }));
                }
                Err(e) => {
                    debug!(request_id = ctx.request_id, asset = %asset, error = %e, "no price for held asset");
                    assets.push(json!({"asset": asset, "balance": balance, "usd_value": Value::Null}));
                }
            }
        }

        Ok(StructuredResult::success(object(json!({
            "assets": assets,
            "total_usd": total_usd,
        }))))
    }
}

pub struct TransactionHistoryHandler {
    ledger: Arc<dyn Ledger>,
}

impl TransactionHistoryHandler {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }
}

#[async_trait]
impl ToolHandler for TransactionHistoryHandler {
    async fn call(&self, ctx: ToolContext, args: JsonObject) -> Result<StructuredResult> {
        let limit = usize_arg(&args, "limit", DEFAULT_HISTORY_LIMIT);
        let txs = self.ledger.transactions(&ctx.user_id, limit).await?;
        let count = txs.len();
        Ok(StructuredResult::success(object(json!({
            "transactions": serde_json::to_value(txs)?,
            "count": count,
        }))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::StaticExchange;
    use crate::ledger::{BuyOrder, MemoryLedger};

    fn ctx() -> ToolContext {
        ToolContext {
            user_id: "alice".into(),
            request_id: 3,
        }
    }

    async fn funded_with(symbol: &str, units: f64) -> Arc<MemoryLedger> {
        let ledger = Arc::new(MemoryLedger::new(1_000.0));
        ledger
            .buy(
                "alice",
                BuyOrder {
                    symbol: symbol.into(),
                    crypto_amount: units,
                    usd_amount: 100.0,
                    price: 100.0 / units,
                },
            )
            .await
            .unwrap();
        ledger
    }

    #[tokio::test]
    async fn test_balance_values_assets() {
        let ledger = funded_with("BTC", 0.01).await;
        let handler = BalanceHandler::new(
            Arc::new(StaticExchange::new().with_price("BTC", 20_000.0)),
            ledger,
        );
        let out = handler.call(ctx(), JsonObject::new()).await.unwrap();
        let data = out.data().unwrap();
        let assets = data["assets"].as_array().unwrap();
        assert_eq!(assets[0]["asset"], "USD");
        assert_eq!(assets[1]["asset"], "BTC");
        assert_eq!(assets[1]["usd_value"], 200.0);
        assert_eq!(data["total_usd"], 1_100.0);
    }

    #[tokio::test]
    async fn test_unpriced_asset_has_null_value() {
        let ledger = funded_with("ZZZ", 3.0).await;
        let handler = BalanceHandler::new(Arc::new(StaticExchange::new()), ledger);
        let out = handler.call(ctx(), JsonObject::new()).await.unwrap();
        let data = out.data().unwrap();
        assert!(data["assets"][1]["usd_value"].is_null());
        assert_eq!(data["total_usd"], 900.0);
    }

    #[tokio::test]
    async fn test_history_count_and_limit() {
        let ledger = funded_with("BTC", 0.01).await;
        let handler = TransactionHistoryHandler::new(ledger);
        let out = handler
            .call(ctx(), object(json!({"limit": 5})))
            .await
            .unwrap();
        let data = out.data().unwrap();
        assert_eq!(data["count"], 1);
        assert_eq!(data["transactions"][0]["type"], "BUY");
    }
}
