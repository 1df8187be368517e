//! 弹性模式模块：按 (用户, 工具) 滑动窗口限流。
//!
//! # Resilience Primitives Module
//!
//! Call admission control for the bridge.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`rate_limiter`] | Sliding-window limiter keyed by `(user, tool)` |
//!
//! ## Rate Limiter
//!
//! A true sliding window: the limiter remembers the timestamp of every admitted
//! call and counts only those inside the trailing window, so a burst straddling
//! a window boundary is still capped at `max_calls`.
//!
//! ```rust
//! use crypto_mcp_bridge::resilience::rate_limiter::{RateLimiterConfig, SlidingWindowRateLimiter};
//!
//! let config = RateLimiterConfig::new().with_max_calls(3).with_window_secs(60);
//! let limiter = SlidingWindowRateLimiter::new(&config);
//!
//! for _ in 0..3 {
//!     assert!(limiter.check_and_record("user_default", "get_crypto_price"));
//! }
//! assert!(!limiter.check_and_record("user_default", "get_crypto_price"));
//! ```

pub mod rate_limiter;
