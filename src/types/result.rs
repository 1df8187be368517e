//! Structured handler results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Error;

/// Arbitrary JSON object (argument sets, result payloads, metadata).
pub type JsonObject = Map<String, Value>;

pub(crate) fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// The value every handler returns.
///
/// Serialized with a `status` tag:
/// `{"status":"success","data":{..},"timestamp":..}` or
/// `{"status":"failure","error_type":"..","error_message":".."}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StructuredResult {
    Success {
        data: JsonObject,
        /// Epoch milliseconds.
        timestamp: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metadata: Option<JsonObject>,
    },
    Failure {
        error_type: String,
        error_message: String,
    },
}

impl StructuredResult {
    pub fn success(data: JsonObject) -> Self {
        StructuredResult::Success {
            data,
            timestamp: epoch_millis(),
            metadata: None,
        }
    }

    pub fn success_with_metadata(data: JsonObject, metadata: JsonObject) -> Self {
        StructuredResult::Success {
            data,
            timestamp: epoch_millis(),
            metadata: if metadata.is_empty() {
                None
            } else {
                Some(metadata)
            },
        }
    }

    pub fn failure(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        StructuredResult::Failure {
            error_type: error_type.into(),
            error_message: error_message.into(),
        }
    }

    /// Normalize a handler error into a `Failure`.
    pub fn from_error(err: &Error) -> Self {
        Self::failure(err.kind().error_type(), err.message())
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StructuredResult::Success { .. })
    }

    pub fn data(&self) -> Option<&JsonObject> {
        match self {
            StructuredResult::Success { data, .. } => Some(data),
            StructuredResult::Failure { .. } => None,
        }
    }

    pub fn error_type(&self) -> Option<&str> {
        match self {
            StructuredResult::Success { .. } => None,
            StructuredResult::Failure { error_type, .. } => Some(error_type),
        }
    }
}

/// Build a [`JsonObject`] from a `json!({...})` literal. Non-object values yield an empty map.
pub fn object(value: Value) -> JsonObject {
    match value {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_serializes_with_status_tag() {
        let result = StructuredResult::Success {
            data: object(json!({"symbol": "BTC/USDT", "last": 64000.5})),
            timestamp: 1_700_000_000_000,
            metadata: None,
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["data"]["symbol"], "BTC/USDT");
        assert!(value.get("metadata").is_none());

        let back: StructuredResult = serde_json::from_value(value).unwrap();
        assert_eq!(back, result);
    }

    #[test]
    fn test_failure_from_error() {
        let err = Error::validation("amount", "amount must be greater than 0");
        let result = StructuredResult::from_error(&err);
        assert_eq!(result.error_type(), Some("validation_error"));
        assert!(!result.is_success());
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["status"], "failure");
        assert_eq!(value["error_message"], "amount must be greater than 0");
    }

    #[test]
    fn test_empty_metadata_is_dropped() {
        let result = StructuredResult::success_with_metadata(JsonObject::new(), JsonObject::new());
        match result {
            StructuredResult::Success { metadata, .. } => assert!(metadata.is_none()),
            _ => panic!("expected success"),
        }
    }
}
