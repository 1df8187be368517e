//! Transient per-user call log.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use super::LogEntry;

type UserLog = Arc<Mutex<VecDeque<LogEntry>>>;

/// In-memory, process-lifetime log keyed by user.
///
/// A user's log is created on first write and holds at most `capacity`
/// entries (oldest evicted first). Like the rate limiter, only the outer map
/// insert takes a write lock; appends lock a single user's log.
pub struct LiveLog {
    capacity: usize,
    users: RwLock<HashMap<String, UserLog>>,
}

impl LiveLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            users: RwLock::new(HashMap::new()),
        }
    }

    fn user_log(&self, user_id: &str) -> UserLog {
        {
            let users = self.users.read().unwrap_or_else(|e| e.into_inner());
            if let Some(log) = users.get(user_id) {
                return log.clone();
            }
        }
        let mut users = self.users.write().unwrap_or_else(|e| e.into_inner());
        users.entry(user_id.to_string()).or_default().clone()
    }

    pub fn append(&self, entry: LogEntry) {
        let log = self.user_log(&entry.user_id);
        let mut log = log.lock().unwrap_or_else(|e| e.into_inner());
        log.push_back(entry);
        while log.len() > self.capacity {
            log.pop_front();
        }
    }

    /// Entries for `user_id` in insertion order.
    pub fn entries(&self, user_id: &str) -> Vec<LogEntry> {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users
            .get(user_id)
            .map(|log| {
                log.lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn clear(&self, user_id: &str) {
        self.users
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(user_id);
    }

    pub fn len(&self, user_id: &str) -> usize {
        let users = self.users.read().unwrap_or_else(|e| e.into_inner());
        users
            .get(user_id)
            .map(|log| log.lock().unwrap_or_else(|e| e.into_inner()).len())
            .unwrap_or(0)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
