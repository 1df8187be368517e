//! 调用日志：会话内存日志与持久化历史。
//!
//! # Call Log Sink
//!
//! Every request/response pair the bridge produces becomes a [`LogEntry`] and is
//! written to two places:
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`LiveLog`] | Transient per-user log, insertion order, cleared on request or restart |
//! | [`DurableLog`] | Background writer in front of a [`LogStore`], paginated newest first |
//! | [`MemoryLogStore`] | In-process store (tests, single-run demos) |
//! | [`JsonlLogStore`] | Append-only JSONL file that survives restarts |
//! | [`NullLogStore`] | Discards history |
//!
//! Durable writes are best-effort: a failing store is logged and never
//! affects the tool call that produced the entry.

mod durable;
mod live;
mod store;

pub use durable::DurableLog;
pub use live::LiveLog;
pub use store::{JsonlLogStore, LogStore, MemoryLogStore, NullLogStore};

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::protocol::{RequestEnvelope, ResponseEnvelope};
use crate::Result;

/// One logged request/response pair. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub entry_id: Uuid,
    pub user_id: String,
    /// `tools/call` or `tools/list`.
    #[serde(rename = "type")]
    pub call_type: String,
    pub request: RequestEnvelope,
    pub response: ResponseEnvelope,
    /// Epoch seconds.
    pub timestamp: f64,
    /// ISO-8601, UTC.
    pub created_at: String,
}

impl LogEntry {
    pub fn new(
        user_id: impl Into<String>,
        request: RequestEnvelope,
        response: ResponseEnvelope,
    ) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0);
        Self {
            entry_id: Uuid::new_v4(),
            user_id: user_id.into(),
            call_type: request.method.clone(),
            request,
            response,
            timestamp,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Both log destinations behind one `record` call.
pub struct LogSink {
    live: LiveLog,
    durable: DurableLog,
}

impl LogSink {
    /// Must be called within a Tokio runtime (starts the durable writer).
    pub fn new(live_capacity: usize, store: Arc<dyn LogStore>) -> Result<Self> {
        Ok(Self {
            live: LiveLog::new(live_capacity),
            durable: DurableLog::spawn(store)?,
        })
    }

    pub fn record(&self, entry: LogEntry) {
        self.live.append(entry.clone());
        self.durable.submit(entry);
    }

    /// Wait for every recorded entry to reach the durable store.
    pub async fn flush(&self) {
        self.durable.flush().await;
    }

    pub fn live(&self) -> &LiveLog {
        &self.live
    }

    pub fn durable(&self) -> &DurableLog {
        &self.durable
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::protocol::{build_request, wrap_response};
    use crate::types::{object, StructuredResult};
    use serde_json::json;

    pub(crate) fn sample_entry(user_id: &str, id: u64) -> LogEntry {
        let request = build_request("get_crypto_price", object(json!({"symbol": "BTC"})), id);
        let response = ResponseEnvelope::Call(wrap_response(
            StructuredResult::success(object(json!({"last": 1.0}))),
            id,
        ));
        LogEntry::new(user_id, request, response)
    }

    #[test]
    fn test_entry_wire_shape() {
        let entry = sample_entry("alice", 5);
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "tools/call");
        assert_eq!(value["user_id"], "alice");
        assert_eq!(value["request"]["id"], value["response"]["id"]);
        assert!(chrono::DateTime::parse_from_rfc3339(value["created_at"].as_str().unwrap()).is_ok());

        let back: LogEntry = serde_json::from_value(value).unwrap();
        assert_eq!(back.entry_id, entry.entry_id);
        assert_eq!(back.request, entry.request);
        assert_eq!(back.response, entry.response);
    }

    #[tokio::test]
    async fn test_record_writes_both_destinations() {
        let sink = LogSink::new(100, Arc::new(MemoryLogStore::new())).unwrap();
        sink.record(sample_entry("alice", 1));
        sink.record(sample_entry("alice", 2));
        assert_eq!(sink.live().len("alice"), 2);
        assert_eq!(sink.durable().count("alice").await.unwrap(), 2);

        sink.live().clear("alice");
        assert_eq!(sink.durable().count("alice").await.unwrap(), 2);
    }
}
