use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info};

use super::{f64_arg, str_arg, BUY_CRYPTO};
use crate::error_code::INSUFFICIENT_FUNDS;
use crate::exchange::{base_asset, ExchangeClient};
use crate::ledger::{BuyOrder, BuyOutcome, Ledger};
use crate::registry::{ToolContext, ToolHandler};
use crate::types::{object, JsonObject, ParamConstraint, ParamSpec, ParamType, StructuredResult, ToolDescriptor};
use crate::{Error, ErrorContext, Result};

pub(super) fn buy_descriptor(max_amount: f64) -> ToolDescriptor {
    ToolDescriptor::new(
        BUY_CRYPTO,
        "Simulate buying a cryptocurrency with USD at the current market price.",
    )
    .param(
        ParamSpec::required("symbol", ParamType::String)
            .with_constraint(ParamConstraint::Symbol)
            .with_description("Asset to buy, e.g. BTC"),
    )
    .param(
        ParamSpec::required("amount", ParamType::Number)
            .with_constraint(ParamConstraint::Positive { max: max_amount })
            .with_description("USD to spend"),
    )
}

/// Simulated market buy: quote the last price, then settle against the ledger.
pub struct BuyHandler {
    exchange: Arc<dyn ExchangeClient>,
    ledger: Arc<dyn Ledger>,
}

impl BuyHandler {
    pub fn new(exchange: Arc<dyn ExchangeClient>, ledger: Arc<dyn Ledger>) -> Self {
        Self { exchange, ledger }
    }
}

#[async_trait]
impl ToolHandler for BuyHandler {
    async fn call(&self, ctx: ToolContext, args: JsonObject) -> Result<StructuredResult> {
        let symbol = str_arg(&args, "symbol")?;
        let usd_amount = f64_arg(&args, "amount")?;

        let ticker = self.exchange.ticker(symbol).await?;
        if !(ticker.last.is_finite() && ticker.last > 0.0) {
            return Err(Error::downstream_with_context(
                format!("no usable price for {}", ticker.symbol),
                ErrorContext::new().with_details(ticker.last.to_string()),
            ));
        }
        let base = base_asset(symbol).to_string();
        let order = BuyOrder {
            symbol: base.clone(),
            crypto_amount: usd_amount / ticker.last,
            usd_amount,
            price: ticker.last,
        };
        debug!(request_id = ctx.request_id, symbol = %base, usd_amount, price = ticker.last, "settling buy");

        match self.ledger.buy(&ctx.user_id, order).await? {
            BuyOutcome::Filled(tx) => {
                info!(user_id = %ctx.user_id, symbol = %tx.symbol, usd = tx.usd_value, "simulated buy filled");
                Ok(StructuredResult::success_with_metadata(
                    object(json!({
                        "action": "buy",
                        "symbol": tx.symbol,
                        "crypto_amount": tx.amount,
                        "usd_spent": tx.usd_value,
                        "price": tx.price,
                    })),
                    object(json!({"simulated": true})),
                ))
            }
            BuyOutcome::InsufficientFunds {
                required,
                available,
            } => Ok(StructuredResult::failure(
                INSUFFICIENT_FUNDS,
                format!("Insufficient balance. Need ${required:.2}, have ${available:.2}"),
            )),
        }
    }
}
