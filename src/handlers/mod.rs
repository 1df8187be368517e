//! 内置工具：行情、模拟交易与账户查询。
//!
//! Built-in tools. Each handler owns `Arc`s to the collaborators it needs and
//! receives arguments the bridge has already validated and normalized against
//! the tool's descriptor.

mod account;
mod market;
mod trading;

pub use account::{BalanceHandler, TransactionHistoryHandler};
pub use market::{OrderBookHandler, PriceHandler};
pub use trading::BuyHandler;

use std::sync::Arc;

use crate::config::BridgeConfig;
use crate::exchange::ExchangeClient;
use crate::ledger::Ledger;
use crate::registry::ToolRegistry;
use crate::types::JsonObject;
use crate::{Error, Result};

pub const GET_CRYPTO_PRICE: &str = "get_crypto_price";
pub const GET_ORDERBOOK: &str = "get_orderbook";
pub const BUY_CRYPTO: &str = "buy_crypto";
pub const CHECK_BALANCE: &str = "check_balance";
pub const TRANSACTION_HISTORY: &str = "transaction_history";

/// Register the five built-in tools, in listing order.
pub fn register_default_tools(
    registry: &mut ToolRegistry,
    exchange: Arc<dyn ExchangeClient>,
    ledger: Arc<dyn Ledger>,
    config: &BridgeConfig,
) -> Result<()> {
    registry.register(
        market::price_descriptor(),
        Arc::new(PriceHandler::new(exchange.clone())),
    )?;
    registry.register(
        market::orderbook_descriptor(),
        Arc::new(OrderBookHandler::new(exchange.clone())),
    )?;
    registry.register(
        trading::buy_descriptor(config.max_numeric_value),
        Arc::new(BuyHandler::new(exchange.clone(), ledger.clone())),
    )?;
    registry.register(
        account::balance_descriptor(),
        Arc::new(BalanceHandler::new(exchange, ledger.clone())),
    )?;
    registry.register(
        account::history_descriptor(),
        Arc::new(TransactionHistoryHandler::new(ledger)),
    )?;
    Ok(())
}

pub fn default_registry(
    exchange: Arc<dyn ExchangeClient>,
    ledger: Arc<dyn Ledger>,
    config: &BridgeConfig,
) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    register_default_tools(&mut registry, exchange, ledger, config)?;
    Ok(registry)
}

fn str_arg<'a>(args: &'a JsonObject, name: &str) -> Result<&'a str> {
    args.get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::validation(name, format!("{name} is required")))
}

fn f64_arg(args: &JsonObject, name: &str) -> Result<f64> {
    args.get(name)
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::validation(name, format!("{name} must be a number")))
}

fn usize_arg(args: &JsonObject, name: &str, default: usize) -> usize {
    args.get(name)
        .and_then(|v| v.as_u64())
        .map(|n| n as usize)
        .unwrap_or(default)
}
