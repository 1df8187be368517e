//! Bridge configuration.
//!
//! Defaults can be overridden from YAML or from the environment:
//! - `CRYPTO_MCP_RATE_LIMIT_MAX_CALLS` (default 1200)
//! - `CRYPTO_MCP_RATE_LIMIT_WINDOW_SECS` (default 60)
//! - `CRYPTO_MCP_HANDLER_TIMEOUT_MS` (default 30000)
//! - `CRYPTO_MCP_LIVE_LOG_CAPACITY` (default 1000)
//! - `CRYPTO_MCP_HISTORY_PATH` (unset: in-memory history)
//! - `CRYPTO_MCP_MAX_NUMERIC_VALUE` (default 1e15)
//! - `CRYPTO_MCP_INITIAL_USD` (default 10000)
//! - `CRYPTO_MCP_EXCHANGE_BASE_URL` (default `https://api.binance.com`)
//! - `CRYPTO_MCP_EXCHANGE_TIMEOUT_SECS` (default 10)
//!
//! Unparsable environment values are ignored and the default is kept.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::exchange::DEFAULT_BASE_URL;
use crate::resilience::rate_limiter::RateLimiterConfig;
use crate::validation::DEFAULT_MAX_NUMERIC_VALUE;
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExchangeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 10,
        }
    }
}

impl ExchangeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub rate_limit: RateLimiterConfig,
    pub handler_timeout_ms: u64,
    /// Per-user cap on the live log; oldest entries are evicted first.
    pub live_log_capacity: usize,
    /// JSONL history file. `None` keeps history in memory.
    pub history_path: Option<PathBuf>,
    pub max_numeric_value: f64,
    pub initial_usd_balance: f64,
    pub exchange: ExchangeConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            rate_limit: RateLimiterConfig::default(),
            handler_timeout_ms: 30_000,
            live_log_capacity: 1_000,
            history_path: None,
            max_numeric_value: DEFAULT_MAX_NUMERIC_VALUE,
            initial_usd_balance: 10_000.0,
            exchange: ExchangeConfig::default(),
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|s| s.trim().parse::<T>().ok())
}

impl BridgeConfig {
    /// Defaults overridden by `CRYPTO_MCP_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_RATE_LIMIT_MAX_CALLS") {
            cfg.rate_limit.max_calls = v;
        }
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_RATE_LIMIT_WINDOW_SECS") {
            cfg.rate_limit.window_secs = v;
        }
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_HANDLER_TIMEOUT_MS") {
            cfg.handler_timeout_ms = v;
        }
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_LIVE_LOG_CAPACITY") {
            cfg.live_log_capacity = v;
        }
        if let Some(path) = lookup("CRYPTO_MCP_HISTORY_PATH").filter(|s| !s.trim().is_empty()) {
            cfg.history_path = Some(PathBuf::from(path));
        }
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_MAX_NUMERIC_VALUE") {
            cfg.max_numeric_value = v;
        }
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_INITIAL_USD") {
            cfg.initial_usd_balance = v;
        }
        if let Some(url) = lookup("CRYPTO_MCP_EXCHANGE_BASE_URL").filter(|s| !s.trim().is_empty()) {
            cfg.exchange.base_url = url;
        }
        if let Some(v) = parsed(&lookup, "CRYPTO_MCP_EXCHANGE_TIMEOUT_SECS") {
            cfg.exchange.timeout_secs = v;
        }
        cfg
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid bridge config: {e}"),
                ErrorContext::new().with_source("yaml"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read config file: {e}"),
                ErrorContext::new().with_details(path.display().to_string()),
            )
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn handler_timeout(&self) -> Duration {
        Duration::from_millis(self.handler_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        let reject = |field: &str, reason: &str| {
            Err(Error::configuration_with_context(
                reason,
                ErrorContext::new().with_field_path(field),
            ))
        };
        if self.rate_limit.max_calls == 0 {
            return reject("rate_limit.max_calls", "must be at least 1");
        }
        if self.rate_limit.window_secs == 0 {
            return reject("rate_limit.window_secs", "must be at least 1");
        }
        if self.handler_timeout_ms == 0 {
            return reject("handler_timeout_ms", "must be at least 1");
        }
        if self.live_log_capacity == 0 {
            return reject("live_log_capacity", "must be at least 1");
        }
        if !(self.max_numeric_value.is_finite() && self.max_numeric_value > 0.0) {
            return reject("max_numeric_value", "must be a positive finite number");
        }
        if !(self.initial_usd_balance.is_finite() && self.initial_usd_balance >= 0.0) {
            return reject("initial_usd_balance", "must be a non-negative finite number");
        }
        if self.exchange.timeout_secs == 0 {
            return reject("exchange.timeout_secs", "must be at least 1");
        }
        Ok(())
    }
}
