//! Login throttling
//!
//! Two sliding windows guard the login endpoints:
//! - failed attempts per login identifier (5 per 15 minutes)
//! - login requests per client IP (10 per minute)

use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::hash::Hash;
use std::net::IpAddr;
use tokio::sync::RwLock;

/// Timestamps of recent events per key, bounded by `limit` within `window`.
pub struct SlidingWindow<K> {
    limit: usize,
    window: Duration,
    events: RwLock<HashMap<K, Vec<DateTime<Utc>>>>,
}

impl<K: Eq + Hash + Clone> SlidingWindow<K> {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            limit,
            window,
            events: RwLock::new(HashMap::new()),
        }
    }

    /// Whether `key` has used up its allowance in the current window
    pub async fn is_limited(&self, key: &K) -> bool {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        match events.get_mut(key) {
            Some(times) => {
                times.retain(|t| *t > cutoff);
                times.len() >= self.limit
            }
            None => false,
        }
    }

    pub async fn record(&self, key: K) {
        let mut events = self.events.write().await;
        events.entry(key).or_default().push(Utc::now());
    }

    pub async fn clear(&self, key: &K) {
        self.events.write().await.remove(key);
    }

    /// Drop expired timestamps and keys with nothing left
    pub async fn cleanup(&self) {
        let cutoff = Utc::now() - self.window;
        let mut events = self.events.write().await;
        events.retain(|_, times| {
            times.retain(|t| *t > cutoff);
            !times.is_empty()
        });
    }

    pub async fn tracked_keys(&self) -> usize {
        self.events.read().await.len()
    }
}

/// Rate limiter shared by the member, moderator and admin login routes
pub struct LoginRateLimiter {
    identifiers: SlidingWindow<String>,
    ips: SlidingWindow<IpAddr>,
}

impl LoginRateLimiter {
    pub fn new() -> Self {
        Self {
            identifiers: SlidingWindow::new(5, Duration::minutes(15)),
            ips: SlidingWindow::new(10, Duration::minutes(1)),
        }
    }

    /// Identifiers are compared case-insensitively
    pub async fn is_identifier_limited(&self, identifier: &str) -> bool {
        self.identifiers
            .is_limited(&identifier.trim().to_lowercase())
            .await
    }

    pub async fn record_failed_attempt(&self, identifier: &str) {
        self.identifiers
            .record(identifier.trim().to_lowercase())
            .await;
    }

    /// Forget failures after a successful login
    pub async fn clear_identifier(&self, identifier: &str) {
        self.identifiers
            .clear(&identifier.trim().to_lowercase())
            .await;
    }

    pub async fn is_ip_limited(&self, ip: IpAddr) -> bool {
        self.ips.is_limited(&ip).await
    }

    pub async fn record_ip_request(&self, ip: IpAddr) {
        self.ips.record(ip).await;
    }

    /// Called periodically from a background task
    pub async fn cleanup(&self) {
        self.identifiers.cleanup().await;
        self.ips.cleanup().await;
    }
}

impl Default for LoginRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
