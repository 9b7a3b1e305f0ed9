//! Fixed-window admission control.
//!
//! Counters are keyed by `prefix:identifier:window_start` so a new
//! window is simply a new key; expiry of stale keys is the store's
//! concern. The store seam exists for Redis-like backends; the
//! in-memory store covers single-process deployments and tests.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::warn;

use crate::config::AdmissionConfig;
use crate::error::Result;
use crate::metrics;

/// Atomic counter storage. `increment` must bump the key and (re-)set
/// its expiry in one step; racing admission checks may not observe a
/// partial state.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Increment `key`, set its expiry to `ttl`, and return the count
    /// after the increment.
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64>;
}

#[async_trait]
impl<T: CounterStore + ?Sized> CounterStore for Arc<T> {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        (**self).increment(key, ttl).await
    }
}

/// Outcome of one admission check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    /// Unix seconds at which the current window ends.
    pub reset_at: u64,
}

pub struct RateLimiter<S> {
    store: S,
    config: AdmissionConfig,
}

impl<S: CounterStore> RateLimiter<S> {
    pub fn new(store: S, config: AdmissionConfig) -> Self {
        Self { store, config }
    }

    /// Check admission for `identifier` against the current window.
    pub async fn check(&self, identifier: &str) -> RateLimitDecision {
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.check_at(identifier, now_secs).await
    }

    /// Check admission at an explicit clock reading. Time is a parameter
    /// so window boundaries are testable without sleeping.
    pub async fn check_at(&self, identifier: &str, now_secs: u64) -> RateLimitDecision {
        let limit = self.config.limit;
        if limit == 0 {
            // Unlimited: skip the counter entirely.
            return RateLimitDecision {
                allowed: true,
                limit,
                remaining: limit,
                reset_at: now_secs,
            };
        }

        let window = self.config.window_seconds.max(1);
        let window_start = now_secs - now_secs % window;
        let key = format!("{}:{}:{}", self.config.prefix, identifier, window_start);
        let ttl = Duration::from_secs(window + 1);

        match self.store.increment(&key, ttl).await {
            Ok(count) => {
                let allowed = count <= limit;
                if !allowed {
                    metrics::record_admission_denied(identifier);
                }
                RateLimitDecision {
                    allowed,
                    limit,
                    remaining: limit.saturating_sub(count),
                    reset_at: window_start + window,
                }
            }
            Err(e) => {
                // Fail open: an infrastructure fault must never block
                // legitimate traffic.
                warn!(identifier, error = %e, "admission counter unavailable, allowing");
                RateLimitDecision {
                    allowed: true,
                    limit,
                    remaining: limit,
                    reset_at: window_start + window,
                }
            }
        }
    }
}

/// In-memory counter store with lazy expiry.
#[derive(Clone, Default)]
pub struct InMemoryCounterStore {
    counters: Arc<Mutex<HashMap<String, (u64, Instant)>>>,
}

impl InMemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn increment(&self, key: &str, ttl: Duration) -> Result<u64> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();
        counters.retain(|_, (_, expires)| *expires > now);

        let entry = counters.entry(key.to_string()).or_insert((0, now + ttl));
        entry.0 += 1;
        entry.1 = now + ttl;
        Ok(entry.0)
    }
}
