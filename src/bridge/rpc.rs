//! Raw JSON-RPC 2.0 entry point.

use serde_json::Value;
use tracing::warn;

use super::McpBridge;
use crate::error_code::{INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR};
use crate::protocol::{build_error_envelope, ResponseEnvelope, JSONRPC_VERSION, TOOLS_CALL, TOOLS_LIST};
use crate::types::JsonObject;

/// Reply with the caller's own id in place of the bridge id.
fn reply(envelope: &ResponseEnvelope, caller_id: &Value) -> Value {
    let mut value = envelope.to_value();
    if let Some(obj) = value.as_object_mut() {
        obj.insert("id".to_string(), caller_id.clone());
    }
    value
}

fn protocol_error(code: i64, message: impl Into<String>, caller_id: &Value) -> Value {
    reply(
        &ResponseEnvelope::Error(build_error_envelope(code, message, 0)),
        caller_id,
    )
}

impl McpBridge {
    /// Handle one serialized JSON-RPC request and return the serialized reply.
    ///
    /// Supports `tools/list` and `tools/call`. Protocol-level failures (parse
    /// error, malformed request, unknown method) are answered directly and
    /// not logged; tool calls go through [`call_tool_envelope`](Self::call_tool_envelope).
    pub async fn handle_message(&self, user_id: &str, text: &str) -> String {
        self.handle_value(user_id, text).await.to_string()
    }

    async fn handle_value(&self, user_id: &str, text: &str) -> Value {
        let message: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(user_id, error = %e, "unparsable JSON-RPC message");
                return protocol_error(PARSE_ERROR, format!("Parse error: {e}"), &Value::Null);
            }
        };
        let Some(request) = message.as_object() else {
            return protocol_error(INVALID_REQUEST, "Invalid Request", &Value::Null);
        };
        let caller_id = request.get("id").cloned().unwrap_or(Value::Null);
        if request.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return protocol_error(INVALID_REQUEST, "Invalid Request: jsonrpc must be \"2.0\"", &caller_id);
        }
        let Some(method) = request.get("method").and_then(Value::as_str) else {
            return protocol_error(INVALID_REQUEST, "Invalid Request: missing method", &caller_id);
        };

        match method {
            TOOLS_LIST => reply(&ResponseEnvelope::List(self.list_tools(user_id)), &caller_id),
            TOOLS_CALL => {
                let params = request.get("params").and_then(Value::as_object);
                let Some(name) = params.and_then(|p| p.get("name")).and_then(Value::as_str) else {
                    return protocol_error(INVALID_PARAMS, "Invalid params: missing tool name", &caller_id);
                };
                let arguments = match params.and_then(|p| p.get("arguments")) {
                    None | Some(Value::Null) => JsonObject::new(),
                    Some(Value::Object(args)) => args.clone(),
                    Some(_) => {
                        return protocol_error(
                            INVALID_PARAMS,
                            "Invalid params: arguments must be an object",
                            &caller_id,
                        )
                    }
                };
                let envelope = self.call_tool_envelope(user_id, name, arguments).await;
                reply(&envelope, &caller_id)
            }
            other => protocol_error(METHOD_NOT_FOUND, format!("Method not found: {other}"), &caller_id),
        }
    }
}
