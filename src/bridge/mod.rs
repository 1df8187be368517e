//! # Bridge
//!
//! 调用编排：解析工具、限流、校验、执行处理器、封装响应并记录日志。
//!
//! [`McpBridge`] is the single entry point agents call. For every
//! `tools/call` it:
//!
//! 1. allocates a request id (process-wide, never reused)
//! 2. resolves the tool, checks the `(user, tool)` rate limit and validates
//!    the arguments, answering with a JSON-RPC error envelope on rejection
//! 3. runs the handler on its own task under the configured timeout
//! 4. wraps the structured result and records the request/response pair in
//!    the live log and the durable history
//!
//! Handler errors, panics and timeouts never escape: they become `Failure`
//! results inside an ordinary response envelope.

mod builder;
mod rpc;

pub use builder::McpBridgeBuilder;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::error_code::ErrorKind;
use crate::log_sink::{LogEntry, LogSink};
use crate::protocol::{
    build_error_envelope, build_list_request, build_request, wrap_list_response, wrap_response,
    ListResponse, RequestEnvelope, ResponseEnvelope,
};
use crate::registry::{ToolContext, ToolRegistry};
use crate::resilience::rate_limiter::{RateLimiterSnapshot, SlidingWindowRateLimiter};
use crate::types::{JsonObject, StructuredResult};
use crate::validation::validate_arguments;
use crate::{Error, Result};

pub struct McpBridge {
    registry: Arc<ToolRegistry>,
    limiter: SlidingWindowRateLimiter,
    sink: LogSink,
    next_id: AtomicU64,
    handler_timeout: Duration,
}

impl McpBridge {
    pub fn builder() -> McpBridgeBuilder {
        McpBridgeBuilder::new()
    }

    fn allocate_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// Run a tool and return the response's text content.
    ///
    /// Rejections (unknown tool, rate limit, invalid arguments) are logged as
    /// error envelopes and returned as `Err`. Once the handler runs the call
    /// always succeeds; handler failures are reported inside the text.
    pub async fn call_tool(
        &self,
        user_id: &str,
        tool_name: &str,
        arguments: JsonObject,
    ) -> Result<String> {
        let (response, rejection) = self.dispatch(user_id, tool_name, arguments).await;
        match rejection {
            Some(e) => Err(e),
            None => Ok(response.text()),
        }
    }

    /// Like [`call_tool`](Self::call_tool) but returns the full envelope,
    /// including error envelopes for rejected calls.
    pub async fn call_tool_envelope(
        &self,
        user_id: &str,
        tool_name: &str,
        arguments: JsonObject,
    ) -> ResponseEnvelope {
        self.dispatch(user_id, tool_name, arguments).await.0
    }

    /// Never fails: rejections render as `Error: <message>`.
    pub async fn call_tool_text(
        &self,
        user_id: &str,
        tool_name: &str,
        arguments: JsonObject,
    ) -> String {
        self.call_tool_envelope(user_id, tool_name, arguments)
            .await
            .text()
    }

    /// `tools/list`: every registered tool in registration order. Logged like a call.
    pub fn list_tools(&self, user_id: &str) -> ListResponse {
        let id = self.allocate_id();
        let response = wrap_list_response(self.registry.list(), id);
        self.record(
            user_id,
            build_list_request(id),
            ResponseEnvelope::List(response.clone()),
        );
        response
    }

    async fn dispatch(
        &self,
        user_id: &str,
        tool_name: &str,
        arguments: JsonObject,
    ) -> (ResponseEnvelope, Option<Error>) {
        let started = Instant::now();
        let id = self.allocate_id();
        let request = build_request(tool_name, arguments.clone(), id);

        let validated = self
            .registry
            .resolve(tool_name)
            .cloned()
            .and_then(|tool| {
                if self.limiter.check_and_record(user_id, tool_name) {
                    Ok(tool)
                } else {
                    Err(Error::RateLimited {
                        user_id: user_id.to_string(),
                        tool: tool_name.to_string(),
                        max_calls: self.limiter.max_calls(),
                        window: self.limiter.window(),
                    })
                }
            })
            .and_then(|tool| {
                validate_arguments(&tool.descriptor, &arguments).map(|args| (tool, args))
            });

        let (tool, args) = match validated {
            Ok(ok) => ok,
            Err(e) => {
                warn!(
                    user_id,
                    tool = tool_name,
                    request_id = id,
                    error_type = e.kind().error_type(),
                    error = %e,
                    "tool call rejected"
                );
                let response =
                    ResponseEnvelope::Error(build_error_envelope(e.kind().rpc_code(), e.to_string(), id));
                self.record(user_id, request, response.clone());
                return (response, Some(e));
            }
        };

        let ctx = ToolContext {
            user_id: user_id.to_string(),
            request_id: id,
        };
        let result = self.run_handler(tool_name, ctx, tool.handler.clone(), args).await;
        let response = ResponseEnvelope::Call(wrap_response(result, id));
        info!(
            user_id,
            tool = tool_name,
            request_id = id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            is_error = response.is_error(),
            "tool call completed"
        );
        self.record(user_id, request, response.clone());
        (response, None)
    }

    async fn run_handler(
        &self,
        tool_name: &str,
        ctx: ToolContext,
        handler: Arc<dyn crate::registry::ToolHandler>,
        args: JsonObject,
    ) -> StructuredResult {
        let request_id = ctx.request_id;
        let mut task = tokio::spawn(async move { handler.call(ctx, args).await });
        match tokio::time::timeout(self.handler_timeout, &mut task).await {
            Ok(Ok(Ok(result))) => result,
            Ok(Ok(Err(e))) => {
                if e.kind() == ErrorKind::Internal {
                    error!(tool = tool_name, request_id, error = %e, "handler failed");
                } else {
                    warn!(tool = tool_name, request_id, error = %e, "handler failed");
                }
                StructuredResult::from_error(&e)
            }
            Ok(Err(join)) => {
                error!(tool = tool_name, request_id, panicked = join.is_panic(), "handler task aborted");
                StructuredResult::failure(
                    ErrorKind::Internal.error_type(),
                    if join.is_panic() {
                        "handler panicked"
                    } else {
                        "handler was cancelled"
                    },
                )
            }
            Err(_) => {
                task.abort();
                let e = Error::Timeout(self.handler_timeout);
                warn!(tool = tool_name, request_id, error = %e, "handler timed out");
                StructuredResult::from_error(&e)
            }
        }
    }

    fn record(&self, user_id: &str, request: RequestEnvelope, response: ResponseEnvelope) {
        self.sink.record(LogEntry::new(user_id, request, response));
    }

    /// Live entries for `user_id`, in insertion order.
    pub fn get_live_log(&self, user_id: &str) -> Vec<LogEntry> {
        self.sink.live().entries(user_id)
    }

    pub fn clear_live_log(&self, user_id: &str) {
        self.sink.live().clear(user_id);
    }

    /// Durable history, newest first; `skip` entries are dropped before `limit` applies.
    pub async fn get_history(
        &self,
        user_id: &str,
        limit: usize,
        skip: usize,
    ) -> Result<Vec<LogEntry>> {
        self.sink.durable().page(user_id, limit, skip).await
    }

    pub async fn delete_history(&self, user_id: &str) -> Result<usize> {
        let deleted = self.sink.durable().delete_user(user_id).await?;
        info!(user_id, deleted, "history deleted");
        Ok(deleted)
    }

    /// Wait until every logged call has reached the durable store.
    ///
    /// Durable writes are queued on a background task; call this before the
    /// runtime stops or the process exits, or queued entries are lost.
    pub async fn flush(&self) {
        self.sink.flush().await;
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn rate_limit_snapshot(&self, user_id: &str, tool_name: &str) -> RateLimiterSnapshot {
        self.limiter.snapshot(user_id, tool_name)
    }

    pub fn handler_timeout(&self) -> Duration {
        self.handler_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error_code::{INVALID_PARAMS, METHOD_NOT_FOUND, RATE_LIMITED};
    use crate::registry::ToolHandler;
    use crate::resilience::rate_limiter::RateLimiterConfig;
    use crate::types::{object, ParamConstraint, ParamSpec, ParamType, ToolDescriptor};
    use async_trait::async_trait;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl ToolHandler for Echo {
        async fn call(&self, _ctx: ToolContext, arguments: JsonObject) -> Result<StructuredResult> {
            Ok(StructuredResult::success(arguments))
        }
    }

    fn bridge(max_calls: usize) -> McpBridge {
        let registry = ToolRegistry::new()
            .with_tool(
                ToolDescriptor::new("echo", "Echo arguments").param(
                    ParamSpec::required("symbol", ParamType::String)
                        .with_constraint(ParamConstraint::Symbol),
                ),
                Arc::new(Echo),
            )
            .unwrap();
        McpBridge::builder()
            .with_registry(registry)
            .with_rate_limit(RateLimiterConfig::new().with_max_calls(max_calls))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_ids_increase_across_calls_and_rejections() {
        let b = bridge(10);
        let r1 = b.call_tool_envelope("u", "echo", object(json!({"symbol": "btc"}))).await;
        let r2 = b.call_tool_envelope("u", "missing", JsonObject::new()).await;
        let r3 = b.call_tool_envelope("v", "echo", object(json!({"symbol": "eth"}))).await;
        assert_eq!((r1.id(), r2.id(), r3.id()), (1, 2, 3));
    }

    #[tokio::test]
    async fn test_rejection_codes() {
        let b = bridge(1);
        let unknown = b.call_tool_envelope("u", "missing", JsonObject::new()).await;
        assert_eq!(unknown.rpc_error().unwrap().code, METHOD_NOT_FOUND);

        let invalid = b.call_tool_envelope("u", "echo", object(json!({"symbol": "!!"}))).await;
        assert_eq!(invalid.rpc_error().unwrap().code, INVALID_PARAMS);

        let limited = b.call_tool_envelope("u", "echo", object(json!({"symbol": "BTC"}))).await;
        assert_eq!(limited.rpc_error().unwrap().code, RATE_LIMITED);
    }

    #[tokio::test]
    async fn test_call_tool_surfaces_rejections_as_errors() {
        let b = bridge(10);
        let err = b
            .call_tool("u", "missing", JsonObject::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnknownTool { .. }));
        assert_eq!(
            b.call_tool_text("u", "missing", JsonObject::new()).await,
            "Error: Tool not found: missing"
        );
    }

    #[tokio::test]
    async fn test_list_tools_is_logged() {
        let b = bridge(10);
        let listing = b.list_tools("u");
        assert_eq!(listing.result.tools[0]["name"], "echo");
        let live = b.get_live_log("u");
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].call_type, "tools/list");
    }

    #[tokio::test]
    async fn test_clear_live_log_keeps_history_and_ids() {
        let b = bridge(10);
        b.call_tool("u", "echo", object(json!({"symbol": "BTC"}))).await.unwrap();
        b.clear_live_log("u");
        assert!(b.get_live_log("u").is_empty());
        assert_eq!(b.get_history("u", 10, 0).await.unwrap().len(), 1);
        let next = b.call_tool_envelope("u", "echo", object(json!({"symbol": "BTC"}))).await;
        assert_eq!(next.id(), 2);
    }
}
