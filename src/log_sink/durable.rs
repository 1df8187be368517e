//! Background writer in front of a [`LogStore`].

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::store::LogStore;
use super::LogEntry;
use crate::{Error, ErrorContext, Result};

enum Command {
    Append(Box<LogEntry>),
    Flush(oneshot::Sender<()>),
}

/// Fire-and-forget durable writes.
///
/// A single task drains the queue, so entries reach the store in submission
/// order. Store failures are logged and dropped. Reads and deletes flush the
/// queue first, so a caller always sees its own earlier writes.
///
/// The writer lives on the runtime that created it. Entries still queued when
/// that runtime shuts down are lost, so await [`flush`](Self::flush) before
/// leaving the runtime.
pub struct DurableLog {
    store: Arc<dyn LogStore>,
    tx: mpsc::UnboundedSender<Command>,
}

impl DurableLog {
    /// Start the writer task. Must be called within a Tokio runtime.
    pub fn spawn(store: Arc<dyn LogStore>) -> Result<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::configuration_with_context(
                "durable log writer requires a Tokio runtime",
                ErrorContext::new()
                    .with_details(e.to_string())
                    .with_source("durable_log"),
            )
        })?;
        let (tx, mut rx) = mpsc::unbounded_channel::<Command>();
        let writer_store = store.clone();
        handle.spawn(async move {
            while let Some(cmd) = rx.recv().await {
                match cmd {
                    Command::Append(entry) => {
                        if let Err(e) = writer_store.append(&entry).await {
                            warn!(
                                store = writer_store.name(),
                                user_id = %entry.user_id,
                                request_id = entry.request.id,
                                error = %e,
                                "durable log write failed; entry dropped"
                            );
                        }
                    }
                    Command::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!(store = writer_store.name(), "durable log writer stopped");
        });
        Ok(Self { store, tx })
    }

    /// Queue an entry. Never blocks and never fails the caller.
    pub fn submit(&self, entry: LogEntry) {
        if let Err(mpsc::error::SendError(Command::Append(entry))) =
            self.tx.send(Command::Append(Box::new(entry)))
        {
            warn!(
                user_id = %entry.user_id,
                request_id = entry.request.id,
                "durable log writer is gone; entry dropped"
            );
        }
    }

    /// Wait until every previously submitted entry has been handed to the store.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Command::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    pub async fn page(&self, user_id: &str, limit: usize, skip: usize) -> Result<Vec<LogEntry>> {
        self.flush().await;
        self.store.page(user_id, limit, skip).await
    }

    pub async fn delete_user(&self, user_id: &str) -> Result<usize> {
        self.flush().await;
        self.store.delete_user(user_id).await
    }

    pub async fn count(&self, user_id: &str) -> Result<usize> {
        self.flush().await;
        self.store.count(user_id).await
    }

    pub fn store_name(&self) -> &'static str {
        self.store.name()
    }
}
