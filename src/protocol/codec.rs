//! Envelope construction.
//!
//! Everything here is pure: the request id is injected by the caller.

use serde_json::{json, Value};

use super::envelope::{
    CallParams, CallResponse, CallResult, ErrorResponse, ListResponse, ListResult,
    RequestEnvelope, RpcError, TextContent, JSONRPC_VERSION, TOOLS_CALL, TOOLS_LIST,
};
use crate::types::{JsonObject, StructuredResult, ToolDescriptor};

pub fn build_request(tool_name: &str, arguments: JsonObject, id: u64) -> RequestEnvelope {
    RequestEnvelope {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: TOOLS_CALL.to_string(),
        params: Some(CallParams {
            name: tool_name.to_string(),
            arguments,
        }),
        id,
    }
}

pub fn build_list_request(id: u64) -> RequestEnvelope {
    RequestEnvelope {
        jsonrpc: JSONRPC_VERSION.to_string(),
        method: TOOLS_LIST.to_string(),
        params: None,
        id,
    }
}

/// Text content for a structured result: the pretty-printed `data` on
/// success, the `{type, message}` error object on failure.
pub fn render_text(result: &StructuredResult) -> String {
    match result {
        StructuredResult::Success { data, .. } => format!("{:#}", Value::Object(data.clone())),
        StructuredResult::Failure {
            error_type,
            error_message,
        } => format!("{:#}", json!({ "type": error_type, "message": error_message })),
    }
}

/// Wrap a handler result. The result is kept verbatim under `structured`.
pub fn wrap_response(result: StructuredResult, request_id: u64) -> CallResponse {
    let text = render_text(&result);
    CallResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        result: CallResult {
            content: vec![TextContent {
                content_type: "text".to_string(),
                text,
            }],
            is_error: !result.is_success(),
        },
        structured: result,
        id: request_id,
    }
}

pub fn wrap_list_response<'a>(
    tools: impl IntoIterator<Item = &'a ToolDescriptor>,
    request_id: u64,
) -> ListResponse {
    ListResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        result: ListResult {
            tools: tools.into_iter().map(ToolDescriptor::to_listing).collect(),
        },
        id: request_id,
    }
}

pub fn build_error_envelope(code: i64, message: impl Into<String>, request_id: u64) -> ErrorResponse {
    ErrorResponse {
        jsonrpc: JSONRPC_VERSION.to_string(),
        error: RpcError {
            code,
            message: message.into(),
        },
        id: request_id,
    }
}
