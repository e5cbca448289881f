// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Fixed-window rate limiter keyed by client IP.
//!
//! The first request from an address opens a window. Up to `max_requests`
//! requests pass inside it; the rest are rejected until it expires.

use crate::config::RateLimitConfig;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Remaining requests in current window
        remaining: u32,
        /// Time until window resets
        reset_in: Duration,
    },
    /// Request is rate limited
    Limited {
        /// Time until the window resets
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Request count for one client within its current window.
#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    fn new(now: Instant) -> Self {
        Self {
            started: now,
            count: 0,
        }
    }

    fn expired(&self, now: Instant, length: Duration) -> bool {
        now.duration_since(self.started) >= length
    }

    fn reset_in(&self, now: Instant, length: Duration) -> Duration {
        length.saturating_sub(now.duration_since(self.started))
    }
}

/// Thread-safe rate limiter.
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Arc<RwLock<HashMap<IpAddr, Window>>>,
}

impl RateLimiter {
    /// Create a new rate limiter with the given configuration.
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Configured requests per window.
    pub fn limit(&self) -> u32 {
        self.config.max_requests
    }

    /// Count a request from `ip` and decide whether it may proceed.
    pub async fn check_ip(&self, ip: IpAddr) -> RateLimitResult {
        self.check_ip_at(ip, Instant::now()).await
    }

    async fn check_ip_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let length = self.config.window_duration();

        // Increment-and-check under one write guard.
        let mut windows = self.windows.write().await;
        let window = windows.entry(ip).or_insert_with(|| Window::new(now));

        if window.expired(now, length) {
            *window = Window::new(now);
        }

        let reset_in = window.reset_in(now, length);

        if window.count < self.config.max_requests {
            window.count += 1;
            RateLimitResult::Allowed {
                remaining: self.config.max_requests - window.count,
                reset_in,
            }
        } else {
            debug!(%ip, retry_after = ?reset_in, "IP rate limit exceeded");
            RateLimitResult::Limited {
                retry_after: reset_in,
            }
        }
    }

    /// Drop windows that have expired (should be called periodically).
    pub async fn cleanup(&self) {
        self.cleanup_at(Instant::now()).await;
    }

    async fn cleanup_at(&self, now: Instant) {
        let length = self.config.window_duration();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, window| !window.expired(now, length));
        debug!(evicted = before - windows.len(), "Rate limiter cleanup");
    }

    /// Number of clients currently tracked.
    pub async fn tracked_clients(&self) -> usize {
        self.windows.read().await.len()
    }
}
