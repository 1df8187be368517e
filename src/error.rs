use crate::error_code::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Structured error context for better error handling and debugging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    /// Argument or configuration key that caused the error (e.g., "symbol", "rate_limit.max_calls")
    pub field_path: Option<String>,
    /// Additional context about the error (e.g., expected type, actual value)
    pub details: Option<String>,
    /// Source of the error (e.g., "validator", "binance", "jsonl_store")
    pub source: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self {
            field_path: None,
            details: None,
            source: None,
        }
    }

    pub fn with_field_path(mut self, path: impl Into<String>) -> Self {
        self.field_path = Some(path.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Unified error type for the bridge.
///
/// The first group of variants is the call-level taxonomy callers branch on;
/// the rest are ambient failures (configuration, storage, I/O).
#[derive(Debug, Error)]
pub enum Error {
    #[error("Tool not found: {name}")]
    UnknownTool { name: String },

    #[error("Tool already registered: {name}")]
    DuplicateTool { name: String },

    #[error(
        "Rate limit exceeded for '{tool}': at most {max_calls} calls per {}s",
        .window.as_secs()
    )]
    RateLimited {
        user_id: String,
        tool: String,
        max_calls: usize,
        window: Duration,
    },

    #[error("Validation error: {message}{}", format_context(.context))]
    Validation {
        message: String,
        context: ErrorContext,
    },

    #[error("Downstream error: {message}{}", format_context(.context))]
    Downstream {
        message: String,
        context: ErrorContext,
    },

    #[error("Handler timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Internal error: {message}{}", format_context(.context))]
    Internal {
        message: String,
        context: ErrorContext,
    },

    #[error("Configuration error: {message}{}", format_context(.context))]
    Configuration {
        message: String,
        context: ErrorContext,
    },

    #[error("Log store error: {message}{}", format_context(.context))]
    Store {
        message: String,
        context: ErrorContext,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

// Helper function to format error context for display
fn format_context(ctx: &ErrorContext) -> String {
    let mut parts = Vec::new();
    if let Some(ref field) = ctx.field_path {
        parts.push(format!("field: {}", field));
    }
    if let Some(ref details) = ctx.details {
        parts.push(format!("details: {}", details));
    }
    if let Some(ref source) = ctx.source {
        parts.push(format!("source: {}", source));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" ({})", parts.join(", "))
    }
}

impl Error {
    /// Argument rejection for a single field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::Validation {
            message: reason.into(),
            context: ErrorContext::new()
                .with_field_path(field)
                .with_source("validator"),
        }
    }

    /// Create a new downstream (external collaborator) error with structured context
    pub fn downstream_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Downstream {
            message: msg.into(),
            context,
        }
    }

    /// Create a new internal error with structured context
    pub fn internal_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Internal {
            message: msg.into(),
            context,
        }
    }

    /// Create a new configuration error with structured context
    pub fn configuration_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Configuration {
            message: msg.into(),
            context,
        }
    }

    /// Create a new log store error with structured context
    pub fn store_with_context(msg: impl Into<String>, context: ErrorContext) -> Self {
        Error::Store {
            message: msg.into(),
            context,
        }
    }

    /// Classify into the call-level taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownTool { .. } => ErrorKind::UnknownTool,
            Error::RateLimited { .. } => ErrorKind::RateLimited,
            Error::Validation { .. } => ErrorKind::Validation,
            Error::Downstream { .. } => ErrorKind::Downstream,
            Error::Timeout(_) => ErrorKind::Timeout,
            Error::DuplicateTool { .. }
            | Error::Internal { .. }
            | Error::Configuration { .. }
            | Error::Store { .. }
            | Error::Io(_)
            | Error::Serialization(_) => ErrorKind::Internal,
        }
    }

    /// The field a validation error refers to, if any.
    pub fn field(&self) -> Option<&str> {
        self.context().and_then(|c| c.field_path.as_deref())
    }

    /// Extract error context if available
    pub fn context(&self) -> Option<&ErrorContext> {
        match self {
            Error::Validation { context, .. }
            | Error::Downstream { context, .. }
            | Error::Internal { context, .. }
            | Error::Configuration { context, .. }
            | Error::Store { context, .. } => Some(context),
            _ => None,
        }
    }

    /// The bare message without the context suffix.
    pub fn message(&self) -> String {
        match self {
            Error::Validation { message, .. }
            | Error::Downstream { message, .. }
            | Error::Internal { message, .. }
            | Error::Configuration { message, .. }
            | Error::Store { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let details = if e.is_timeout() {
            "timeout"
        } else if e.is_connect() {
            "connect"
        } else if e.is_decode() {
            "decode"
        } else {
            "request"
        };
        Error::downstream_with_context(
            e.to_string(),
            ErrorContext::new()
                .with_details(details)
                .with_source("http"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_display_includes_field() {
        let err = Error::validation("symbol", "Symbol must be a non-empty string");
        let text = err.to_string();
        assert!(text.starts_with("Validation error: Symbol must be a non-empty string"));
        assert!(text.contains("field: symbol"));
        assert_eq!(err.field(), Some("symbol"));
        assert_eq!(err.message(), "Symbol must be a non-empty string");
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            Error::UnknownTool { name: "x".into() }.kind(),
            ErrorKind::UnknownTool
        );
        assert_eq!(
            Error::Timeout(Duration::from_millis(5)).kind(),
            ErrorKind::Timeout
        );
        assert_eq!(
            Error::downstream_with_context("connection refused", ErrorContext::new()).kind(),
            ErrorKind::Downstream
        );
        assert_eq!(
            Error::DuplicateTool { name: "x".into() }.kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_rate_limited_display() {
        let err = Error::RateLimited {
            user_id: "u1".into(),
            tool: "get_crypto_price".into(),
            max_calls: 3,
            window: Duration::from_secs(60),
        };
        assert_eq!(
            err.to_string(),
            "Rate limit exceeded for 'get_crypto_price': at most 3 calls per 60s"
        );
    }
}
