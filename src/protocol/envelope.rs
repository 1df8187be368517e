//! JSON-RPC 2.0 envelopes for `tools/call` and `tools/list`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{JsonObject, StructuredResult};

/// Protocol version literal.
pub const JSONRPC_VERSION: &str = "2.0";

pub const TOOLS_CALL: &str = "tools/call";
pub const TOOLS_LIST: &str = "tools/list";

/// `params` of a `tools/call` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallParams {
    pub name: String,
    #[serde(default)]
    pub arguments: JsonObject,
}

/// Outbound request envelope. `params` is absent for `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<CallParams>,
    pub id: u64,
}

/// MCP content block. The bridge only emits `text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    #[serde(rename = "type")]
    pub content_type: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResult {
    pub content: Vec<TextContent>,
    #[serde(alias = "isError")]
    pub is_error: bool,
}

/// Response to a `tools/call` whose handler ran (successfully or not).
///
/// `structured` always carries the handler's typed result, so inspectors do not
/// have to re-parse the text content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallResponse {
    pub jsonrpc: String,
    pub result: CallResult,
    pub structured: StructuredResult,
    pub id: u64,
}

impl CallResponse {
    pub fn text(&self) -> &str {
        self.result
            .content
            .first()
            .map(|c| c.text.as_str())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Response when the bridge rejected the call before any handler ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub jsonrpc: String,
    pub error: RpcError,
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResult {
    pub tools: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse {
    pub jsonrpc: String,
    pub result: ListResult,
    pub id: u64,
}

/// Any response the bridge can log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope {
    Call(CallResponse),
    List(ListResponse),
    Error(ErrorResponse),
}

impl ResponseEnvelope {
    pub fn id(&self) -> u64 {
        match self {
            ResponseEnvelope::Call(r) => r.id,
            ResponseEnvelope::List(r) => r.id,
            ResponseEnvelope::Error(r) => r.id,
        }
    }

    /// True for error envelopes and for call results flagged `is_error`.
    pub fn is_error(&self) -> bool {
        match self {
            ResponseEnvelope::Call(r) => r.result.is_error,
            ResponseEnvelope::List(_) => false,
            ResponseEnvelope::Error(_) => true,
        }
    }

    pub fn structured(&self) -> Option<&StructuredResult> {
        match self {
            ResponseEnvelope::Call(r) => Some(&r.structured),
            _ => None,
        }
    }

    pub fn rpc_error(&self) -> Option<&RpcError> {
        match self {
            ResponseEnvelope::Error(r) => Some(&r.error),
            _ => None,
        }
    }

    /// What an agent-side tool wrapper shows the model.
    pub fn text(&self) -> String {
        match self {
            ResponseEnvelope::Call(r) => r.text().to_string(),
            ResponseEnvelope::List(r) => format!("{:#}", Value::Array(r.result.tools.clone())),
            ResponseEnvelope::Error(r) => format!("Error: {}", r.error.message),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
