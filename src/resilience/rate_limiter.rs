use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct RateLimiterSnapshot {
    pub max_calls: usize,
    pub window: Duration,
    /// Calls currently inside the trailing window.
    pub in_window: usize,
    /// Time until the oldest call leaves the window (ms), if the key is currently full.
    pub estimated_wait_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    /// Maximum admitted calls per window.
    pub max_calls: usize,
    /// Trailing window width, seconds.
    pub window_secs: u64,
}

impl RateLimiterConfig {
    /// Create a new config with default values (1200 calls / 60s)
    pub fn new() -> Self {
        Self {
            max_calls: 1200,
            window_secs: 60,
        }
    }

    pub fn with_max_calls(mut self, max_calls: usize) -> Self {
        self.max_calls = max_calls;
        self
    }

    pub fn with_window_secs(mut self, secs: u64) -> Self {
        self.window_secs = secs;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// `(user, tool)` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RateKey {
    user_id: String,
    tool: String,
}

type Timestamps = Arc<Mutex<VecDeque<Instant>>>;

/// Idle keys are swept once every this many checks.
const PURGE_INTERVAL: u64 = 1024;

/// Sliding-window call limiter keyed by `(user, tool)`.
///
/// - Each key keeps the timestamps of its admitted calls
/// - Timestamps older than the window are evicted on every check
/// - A call is admitted (and recorded) only while fewer than `max_calls` remain
///
/// The outer map is only write-locked to insert a new key or sweep idle ones;
/// each key has its own mutex, so unrelated users and tools never contend.
pub struct SlidingWindowRateLimiter {
    max_calls: usize,
    window: Duration,
    keys: RwLock<HashMap<RateKey, Timestamps>>,
    checks: AtomicU64,
}

impl SlidingWindowRateLimiter {
    pub fn new(cfg: &RateLimiterConfig) -> Self {
        Self::with_window(cfg.max_calls, cfg.window())
    }

    /// Sub-second windows are handy in tests.
    pub fn with_window(max_calls: usize, window: Duration) -> Self {
        Self {
            max_calls,
            window,
            keys: RwLock::new(HashMap::new()),
            checks: AtomicU64::new(0),
        }
    }

    pub fn max_calls(&self) -> usize {
        self.max_calls
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn slot(&self, user_id: &str, tool: &str) -> Timestamps {
        let key = RateKey {
            user_id: user_id.to_string(),
            tool: tool.to_string(),
        };
        {
            let keys = self.keys.read().unwrap_or_else(|e| e.into_inner());
            if let Some(slot) = keys.get(&key) {
                return slot.clone();
            }
        }
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        keys.entry(key).or_default().clone()
    }

    fn evict(window: Duration, calls: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&oldest) = calls.front() {
            if now.duration_since(oldest) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    /// Admit and record one call for `(user_id, tool)`, or refuse without recording.
    pub fn check_and_record(&self, user_id: &str, tool: &str) -> bool {
        self.check_and_record_at(user_id, tool, Instant::now())
    }

    pub(crate) fn check_and_record_at(&self, user_id: &str, tool: &str, now: Instant) -> bool {
        if self.checks.fetch_add(1, Ordering::Relaxed) % PURGE_INTERVAL == PURGE_INTERVAL - 1 {
            self.purge_idle();
        }
        let slot = self.slot(user_id, tool);
        let mut calls = slot.lock().unwrap_or_else(|e| e.into_inner());
        Self::evict(self.window, &mut calls, now);
        if calls.len() < self.max_calls {
            calls.push_back(now);
            true
        } else {
            false
        }
    }

    /// Read-only: an untracked key reports an empty window and is not inserted.
    pub fn snapshot(&self, user_id: &str, tool: &str) -> RateLimiterSnapshot {
        let now = Instant::now();
        let key = RateKey {
            user_id: user_id.to_string(),
            tool: tool.to_string(),
        };
        let slot = self
            .keys
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        let Some(slot) = slot else {
            return RateLimiterSnapshot {
                max_calls: self.max_calls,
                window: self.window,
                in_window: 0,
                estimated_wait_ms: None,
            };
        };
        let mut calls = slot.lock().unwrap_or_else(|e| e.into_inner());
        Self::evict(self.window, &mut calls, now);

        let estimated_wait_ms = if calls.len() >= self.max_calls {
            calls.front().map(|&oldest| {
                let leaves_at = oldest + self.window;
                leaves_at.saturating_duration_since(now).as_millis() as u64
            })
        } else {
            None
        };

        RateLimiterSnapshot {
            max_calls: self.max_calls,
            window: self.window,
            in_window: calls.len(),
            estimated_wait_ms,
        }
    }

    /// Drop keys whose window has fully drained. Returns how many were removed.
    ///
    /// Runs automatically every few checks. A key whose slot is held by an
    /// in-flight check is kept, even if still empty.
    pub fn purge_idle(&self) -> usize {
        let now = Instant::now();
        let mut keys = self.keys.write().unwrap_or_else(|e| e.into_inner());
        let before = keys.len();
        keys.retain(|_, slot| {
            if Arc::strong_count(slot) > 1 {
                return true;
            }
            let mut calls = slot.lock().unwrap_or_else(|e| e.into_inner());
            Self::evict(self.window, &mut calls, now);
            !calls.is_empty()
        });
        before - keys.len()
    }

    /// Number of tracked `(user, tool)` keys.
    pub fn tracked_keys(&self) -> usize {
        self.keys.read().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limiter_config_builder() {
        let config = RateLimiterConfig::new().with_max_calls(3).with_window_secs(10);
        assert_eq!(config.max_calls, 3);
        assert_eq!(config.window(), Duration::from_secs(10));
        assert_eq!(RateLimiterConfig::default().max_calls, 1200);
    }

    #[test]
    fn test_admits_up_to_limit() {
        let limiter = SlidingWindowRateLimiter::new(
            &RateLimiterConfig::new().with_max_calls(3).with_window_secs(60),
        );
        assert!(limiter.check_and_record("u1", "get_crypto_price"));
        assert!(limiter.check_and_record("u1", "get_crypto_price"));
        assert!(limiter.check_and_record("u1", "get_crypto_price"));
        assert!(!limiter.check_and_record("u1", "get_crypto_price"));

        let snap = limiter.snapshot("u1", "get_crypto_price");
        assert_eq!(snap.in_window, 3);
        assert!(snap.estimated_wait_ms.is_some());
    }

    #[test]
    fn test_rejection_is_not_recorded() {
        let limiter = SlidingWindowRateLimiter::with_window(1, Duration::from_secs(60));
        assert!(limiter.check_and_record("u1", "t"));
        for _ in 0..5 {
            assert!(!limiter.check_and_record("u1", "t"));
        }
        assert_eq!(limiter.snapshot("u1", "t").in_window, 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = SlidingWindowRateLimiter::with_window(1, Duration::from_secs(60));
        assert!(limiter.check_and_record("u1", "a"));
        assert!(limiter.check_and_record("u1", "b"));
        assert!(limiter.check_and_record("u2", "a"));
        assert!(!limiter.check_and_record("u1", "a"));
        assert_eq!(limiter.tracked_keys(), 3);
    }

    #[test]
    fn test_window_slides_rather_than_resets() {
        let limiter = SlidingWindowRateLimiter::with_window(2, Duration::from_secs(10));
        let t0 = Instant::now();
        assert!(limiter.check_and_record_at("u", "t", t0));
        assert!(limiter.check_and_record_at("u", "t", t0 + Duration::from_secs(6)));
        // At t0+9 both calls are still inside the trailing window.
        assert!(!limiter.check_and_record_at("u", "t", t0 + Duration::from_secs(9)));
        // At t0+10 the first call has left; only one slot frees up.
        assert!(limiter.check_and_record_at("u", "t", t0 + Duration::from_secs(10)));
        assert!(!limiter.check_and_record_at("u", "t", t0 + Duration::from_secs(11)));
        // The t0+6 call leaves at t0+16.
        assert!(limiter.check_and_record_at("u", "t", t0 + Duration::from_secs(16)));
    }

    #[test]
    fn test_purge_idle() {
        let limiter = SlidingWindowRateLimiter::with_window(5, Duration::from_millis(20));
        assert!(limiter.check_and_record("u1", "t"));
        assert!(limiter.check_and_record("u2", "t"));
        std::thread::sleep(Duration::from_millis(30));
        assert_eq!(limiter.purge_idle(), 2);
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_purge_keeps_slot_held_by_in_flight_check() {
        let limiter = SlidingWindowRateLimiter::with_window(1, Duration::from_secs(60));
        let held = limiter.slot("u", "t");
        assert_eq!(limiter.purge_idle(), 0);
        held.lock().unwrap().push_back(Instant::now());
        drop(held);
        assert!(!limiter.check_and_record("u", "t"));
        assert_eq!(limiter.snapshot("u", "t").in_window, 1);
    }

    #[test]
    fn test_snapshot_does_not_track_new_keys() {
        let limiter = SlidingWindowRateLimiter::with_window(3, Duration::from_secs(60));
        let snap = limiter.snapshot("nobody", "t");
        assert_eq!(snap.in_window, 0);
        assert!(snap.estimated_wait_ms.is_none());
        assert_eq!(limiter.tracked_keys(), 0);
    }

    #[test]
    fn test_idle_keys_are_swept_during_checks() {
        let limiter = SlidingWindowRateLimiter::with_window(usize::MAX, Duration::from_millis(5));
        for i in 0..10 {
            assert!(limiter.check_and_record(&format!("gone-{i}"), "t"));
        }
        std::thread::sleep(Duration::from_millis(20));
        for _ in 0..PURGE_INTERVAL {
            limiter.check_and_record("active", "t");
        }
        assert!(limiter.tracked_keys() <= 1);
    }

    #[test]
    fn test_concurrent_checks_never_over_admit() {
        let limiter = Arc::new(SlidingWindowRateLimiter::with_window(
            50,
            Duration::from_secs(60),
        ));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..20)
                        .filter(|_| limiter.check_and_record("shared", "t"))
                        .count()
                })
            })
            .collect();
        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }
}
