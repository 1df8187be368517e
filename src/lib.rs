//! # crypto-mcp-bridge
//!
//! 进程内 MCP 风格的 JSON-RPC 工具桥：为加密货币助手提供行情查询、模拟交易与调用日志。
//!
//! In-process, MCP-style tool bridge for a crypto trading assistant. Agents
//! call tools by name with a JSON argument object; the bridge resolves the
//! tool, enforces a per-`(user, tool)` sliding-window rate limit, validates
//! the arguments, runs the handler under a timeout, wraps the outcome in a
//! JSON-RPC 2.0 envelope and records the request/response pair.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use crypto_mcp_bridge::{BridgeConfig, McpBridge, MemoryLedger, StaticExchange};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> crypto_mcp_bridge::Result<()> {
//!     let config = BridgeConfig::from_env();
//!     let bridge = McpBridge::builder()
//!         .with_config(config.clone())
//!         .with_default_tools(
//!             Arc::new(StaticExchange::default()),
//!             Arc::new(MemoryLedger::new(config.initial_usd_balance)),
//!         )?
//!         .build()?;
//!
//!     let text = bridge
//!         .call_tool("alice", "get_crypto_price", crypto_mcp_bridge::types::object(json!({"symbol": "btc"})))
//!         .await?;
//!     println!("{text}");
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | Call orchestration and the raw JSON-RPC entry point |
//! | [`registry`] | Tool name → descriptor + handler |
//! | [`validation`] | Argument validation and coercion |
//! | [`resilience`] | Sliding-window rate limiting |
//! | [`protocol`] | JSON-RPC envelopes and their codec |
//! | [`log_sink`] | Live per-user log and durable history |
//! | [`handlers`] | Built-in market, trading and account tools |
//! | [`exchange`] | Market-data clients |
//! | [`ledger`] | Simulated wallets |
//! | [`config`] | Configuration from YAML or environment |

pub mod bridge;
pub mod config;
pub mod exchange;
pub mod handlers;
pub mod ledger;
pub mod log_sink;
pub mod protocol;
pub mod registry;
pub mod resilience;
pub mod types;
pub mod validation;

// Re-export main types for convenience
pub use bridge::{McpBridge, McpBridgeBuilder};
pub use config::{BridgeConfig, ExchangeConfig};
pub use exchange::{BinanceExchange, ExchangeClient, StaticExchange};
pub use ledger::{Ledger, MemoryLedger};
pub use log_sink::{JsonlLogStore, LogEntry, LogStore, MemoryLogStore, NullLogStore};
pub use protocol::ResponseEnvelope;
pub use registry::{ToolContext, ToolHandler, ToolRegistry};
pub use types::{JsonObject, StructuredResult, ToolDescriptor};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};

/// JSON-RPC error codes and the call-level error taxonomy
pub mod error_code;
