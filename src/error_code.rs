//! JSON-RPC error codes and the call-level error taxonomy.
//!
//! Every failure the bridge reports is classified into an [`ErrorKind`]. The kind
//! decides three things: the JSON-RPC code used when the bridge rejects a call
//! with an error envelope, the `error_type` string stored in a `Failure`
//! structured result, and whether the caller may retry.
//!
//! | Kind          | Code     | `error_type`       | Retryable |
//! |---------------|----------|--------------------|-----------|
//! | UnknownTool   | -32601   | `tool_not_found`   | no        |
//! | RateLimited   | -32001   | `rate_limited`     | yes       |
//! | Validation    | -32602   | `validation_error` | no        |
//! | Downstream    | -32603   | `downstream_error` | yes       |
//! | Timeout       | -32603   | `timeout`          | yes       |
//! | Internal      | -32603   | `internal_error`   | no        |
//!
//! ## Example
//!
//! ```rust
//! use crypto_mcp_bridge::error_code::{ErrorKind, RATE_LIMITED};
//!
//! let kind = ErrorKind::from_error_type("rate_limited").unwrap();
//! assert_eq!(kind.rpc_code(), RATE_LIMITED);
//! assert!(kind.retryable());
//! ```

use std::fmt;

/// Parse error - invalid JSON was received
pub const PARSE_ERROR: i64 = -32700;

/// Invalid Request - the JSON sent is not a valid request object
pub const INVALID_REQUEST: i64 = -32600;

/// Method or tool not found
pub const METHOD_NOT_FOUND: i64 = -32601;

/// Invalid params - arguments rejected before the handler ran
pub const INVALID_PARAMS: i64 = -32602;

/// Internal error
pub const INTERNAL_ERROR: i64 = -32603;

/// Rate limited (server-defined range)
pub const RATE_LIMITED: i64 = -32001;

/// `error_type` used by the buy handler when the wallet cannot cover the order.
pub const INSUFFICIENT_FUNDS: &str = "insufficient_funds";

/// Call-level error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Caller referenced a tool absent from the registry
    UnknownTool,
    /// Caller exceeded the sliding-window budget
    RateLimited,
    /// Arguments rejected
    Validation,
    /// External collaborator (exchange, datastore) failed
    Downstream,
    /// Handler exceeded its allotted time
    Timeout,
    /// Anything else
    Internal,
}

impl ErrorKind {
    /// JSON-RPC code for an error envelope of this kind.
    #[inline]
    pub fn rpc_code(&self) -> i64 {
        match self {
            Self::UnknownTool => METHOD_NOT_FOUND,
            Self::RateLimited => RATE_LIMITED,
            Self::Validation => INVALID_PARAMS,
            Self::Downstream | Self::Timeout | Self::Internal => INTERNAL_ERROR,
        }
    }

    /// `error_type` string carried by a `Failure` structured result.
    #[inline]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::UnknownTool => "tool_not_found",
            Self::RateLimited => "rate_limited",
            Self::Validation => "validation_error",
            Self::Downstream => "downstream_error",
            Self::Timeout => "timeout",
            Self::Internal => "internal_error",
        }
    }

    /// Returns whether the caller may retry after backoff.
    #[inline]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::Downstream | Self::Timeout)
    }

    /// Maps an `error_type` string back to its kind.
    pub fn from_error_type(error_type: &str) -> Option<Self> {
        let kind = match error_type {
            "tool_not_found" => Self::UnknownTool,
            "rate_limited" | "rate_limit_exceeded" => Self::RateLimited,
            "validation_error" => Self::Validation,
            "downstream_error" | "exchange_error" => Self::Downstream,
            "timeout" => Self::Timeout,
            "internal_error" => Self::Internal,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error_type())
    }
}
