//! Durable log store backends.

use super::LogEntry;
use crate::{ErrorContext, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Append-only history of log entries.
///
/// `page` returns a user's entries newest first (by insertion order), after
/// dropping `skip` and taking at most `limit`.
#[async_trait]
pub trait LogStore: Send + Sync {
    async fn append(&self, entry: &LogEntry) -> Result<()>;
    async fn page(&self, user_id: &str, limit: usize, skip: usize) -> Result<Vec<LogEntry>>;
    async fn delete_user(&self, user_id: &str) -> Result<usize>;
    async fn count(&self, user_id: &str) -> Result<usize>;
    fn name(&self) -> &'static str;
}

fn newest_first(entries: impl DoubleEndedIterator<Item = LogEntry>, limit: usize, skip: usize) -> Vec<LogEntry> {
    entries.rev().skip(skip).take(limit).collect()
}

pub struct MemoryLogStore {
    users: RwLock<HashMap<String, Vec<LogEntry>>>,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for MemoryLogStore {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        self.users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .entry(entry.user_id.clone())
            .or_default()
            .push(entry.clone());
        Ok(())
    }
    async fn page(&self, user_id: &str, limit: usize, skip: usize) -> Result<Vec<LogEntry>> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        Ok(users
            .get(user_id)
            .map(|v| newest_first(v.iter().cloned(), limit, skip))
            .unwrap_or_default())
    }
    async fn delete_user(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id)
            .map(|v| v.len())
            .unwrap_or(0))
    }
    async fn count(&self, user_id: &str) -> Result<usize> {
        Ok(self
            .users
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(user_id)
            .map(|v| v.len())
            .unwrap_or(0))
    }
    fn name(&self) -> &'static str {
        "memory"
    }
}

/// Discards everything.
pub struct NullLogStore;
impl NullLogStore {
    pub fn new() -> Self {
        Self
    }
}
impl Default for NullLogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogStore for NullLogStore {
    async fn append(&self, _: &LogEntry) -> Result<()> {
        Ok(())
    }
    async fn page(&self, _: &str, _: usize, _: usize) -> Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }
    async fn delete_user(&self, _: &str) -> Result<usize> {
        Ok(0)
    }
    async fn count(&self, _: &str) -> Result<usize> {
        Ok(0)
    }
    fn name(&self) -> &'static str {
        "null"
    }
}

/// One JSON document per line in a single append-only file.
///
/// Survives restarts. Deleting a user's history rewrites the file through a
/// temporary sibling and an atomic rename.
pub struct JsonlLogStore {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonlLogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn store_error(&self, msg: impl Into<String>) -> crate::Error {
        crate::Error::store_with_context(
            msg,
            ErrorContext::new()
                .with_details(self.path.display().to_string())
                .with_source("jsonl_store"),
        )
    }

    async fn read_raw(&self) -> Result<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => Ok(raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
            Err(e) => Err(self.store_error(format!("read failed: {e}"))),
        }
    }

    async fn read_all(&self) -> Result<Vec<LogEntry>> {
        let raw = self.read_raw().await?;
        let mut entries = Vec::new();
        for (lineno, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<LogEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => warn!(
                    path = %self.path.display(),
                    line = lineno + 1,
                    error = %e,
                    "skipping unreadable log line"
                ),
            }
        }
        Ok(entries)
    }
}

#[async_trait]
impl LogStore for JsonlLogStore {
    async fn append(&self, entry: &LogEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| self.store_error(format!("open failed: {e}")))?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    async fn page(&self, user_id: &str, limit: usize, skip: usize) -> Result<Vec<LogEntry>> {
        let _guard = self.lock.lock().await;
        let entries = self.read_all().await?;
        Ok(newest_first(
            entries.into_iter().filter(|e| e.user_id == user_id),
            limit,
            skip,
        ))
    }

    async fn delete_user(&self, user_id: &str) -> Result<usize> {
        let _guard = self.lock.lock().await;
        let raw = self.read_raw().await?;
        let mut removed = 0;
        let mut body = String::with_capacity(raw.len());
        for line in raw.lines() {
            if line.trim().is_empty() {
                continue;
            }
            // Lines that do not parse belong to nobody and are carried over as-is.
            if serde_json::from_str::<LogEntry>(line).is_ok_and(|e| e.user_id == user_id) {
                removed += 1;
                continue;
            }
            body.push_str(line);
            body.push('\n');
        }
        if removed == 0 {
            return Ok(0);
        }

        let tmp = self.path.with_extension("jsonl.tmp");
        tokio::fs::write(&tmp, body)
            .await
            .map_err(|e| self.store_error(format!("rewrite failed: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.store_error(format!("rename failed: {e}")))?;
        Ok(removed)
    }

    async fn count(&self, user_id: &str) -> Result<usize> {
        let _guard = self.lock.lock().await;
        Ok(self
            .read_all()
            .await?
            .iter()
            .filter(|e| e.user_id == user_id)
            .count())
    }

    fn name(&self) -> &'static str {
        "jsonl"
    }
}
