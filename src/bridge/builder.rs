use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::McpBridge;
use crate::config::BridgeConfig;
use crate::exchange::ExchangeClient;
use crate::handlers::default_registry;
use crate::ledger::Ledger;
use crate::log_sink::{JsonlLogStore, LogSink, LogStore, MemoryLogStore};
use crate::registry::ToolRegistry;
use crate::resilience::rate_limiter::{RateLimiterConfig, SlidingWindowRateLimiter};
use crate::{Error, ErrorContext, Result};

/// Builder for [`McpBridge`].
///
/// Without an explicit store, history goes to a JSONL file when
/// `history_path` is configured and stays in memory otherwise.
pub struct McpBridgeBuilder {
    config: BridgeConfig,
    registry: Option<ToolRegistry>,
    store: Option<Arc<dyn LogStore>>,
}

impl McpBridgeBuilder {
    pub fn new() -> Self {
        Self {
            config: BridgeConfig::default(),
            registry: None,
            store: None,
        }
    }

    pub fn with_config(mut self, config: BridgeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_registry(mut self, registry: ToolRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Register the built-in tools against the given collaborators.
    ///
    /// Uses the builder's current config, so call [`with_config`](Self::with_config) first.
    pub fn with_default_tools(
        mut self,
        exchange: Arc<dyn ExchangeClient>,
        ledger: Arc<dyn Ledger>,
    ) -> Result<Self> {
        self.registry = Some(default_registry(exchange, ledger, &self.config)?);
        Ok(self)
    }

    pub fn with_log_store(mut self, store: Arc<dyn LogStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimiterConfig) -> Self {
        self.config.rate_limit = rate_limit;
        self
    }

    pub fn with_handler_timeout(mut self, timeout: Duration) -> Self {
        self.config.handler_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_live_log_capacity(mut self, capacity: usize) -> Self {
        self.config.live_log_capacity = capacity;
        self
    }

    /// Build the bridge. Must be called within a Tokio runtime.
    pub fn build(self) -> Result<McpBridge> {
        self.config.validate()?;
        let registry = self.registry.ok_or_else(|| {
            Error::configuration_with_context(
                "no tool registry configured",
                ErrorContext::new().with_source("bridge_builder"),
            )
        })?;
        let store: Arc<dyn LogStore> = match (self.store, &self.config.history_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(JsonlLogStore::new(path.clone())),
            (None, None) => Arc::new(MemoryLogStore::new()),
        };
        debug!(
            tools = registry.len(),
            store = store.name(),
            max_calls = self.config.rate_limit.max_calls,
            window_secs = self.config.rate_limit.window_secs,
            "building bridge"
        );
        Ok(McpBridge {
            registry: Arc::new(registry),
            limiter: SlidingWindowRateLimiter::new(&self.config.rate_limit),
            sink: LogSink::new(self.config.live_log_capacity, store)?,
            next_id: AtomicU64::new(1),
            handler_timeout: self.config.handler_timeout(),
        })
    }
}

impl Default for McpBridgeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
