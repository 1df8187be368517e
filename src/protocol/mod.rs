//! 协议编解码：构建 JSON-RPC 请求与响应信封。
//!
//! Request/response codec.
//!
//! Every tool invocation is recorded as a JSON-RPC 2.0 pair:
//!
//! ```json
//! {"jsonrpc":"2.0","method":"tools/call","params":{"name":"get_crypto_price","arguments":{"symbol":"BTC"}},"id":1}
//! {"jsonrpc":"2.0","result":{"content":[{"type":"text","text":"{...}"}],"is_error":false},"structured":{...},"id":1}
//! ```
//!
//! or, when the bridge refuses the call before a handler runs:
//!
//! ```json
//! {"jsonrpc":"2.0","error":{"code":-32601,"message":"Tool not found: delete_everything"},"id":2}
//! ```

pub mod codec;
pub mod envelope;

pub use codec::{
    build_error_envelope, build_list_request, build_request, render_text, wrap_list_response,
    wrap_response,
};
pub use envelope::{
    CallParams, CallResponse, CallResult, ErrorResponse, ListResponse, ListResult,
    RequestEnvelope, ResponseEnvelope, RpcError, TextContent, JSONRPC_VERSION, TOOLS_CALL,
    TOOLS_LIST,
};
