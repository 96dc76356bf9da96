// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Token bucket rate limiter for profile-page write surfaces.
//!
//! One [`RateLimiter`] guards one surface. Buckets are keyed by an opaque
//! caller-built string, created full on first use and refilled continuously
//! (fractional accrual, not discrete ticks). State lives in this process
//! only; parallel instances each keep their own view of the quota.
//!
//! Eviction only ever drops a bucket that has refilled to capacity, so a
//! dropped key comes back exactly as it would have been. Buckets are indexed
//! by the time they become full, which keeps both the sweep and the
//! `max_buckets` cap from scanning the whole table.

use crate::clock::{Clock, MonotonicClock};
use crate::config::{BucketConfig, SweepConfig};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// Result of a rate limit check.
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitResult {
    /// Request is allowed
    Allowed {
        /// Whole tokens left after this request
        remaining: u32,
    },
    /// Request is rate limited
    Limited {
        /// Time until the bucket holds one token again
        retry_after: Duration,
    },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }
}

/// Per-key token bucket.
#[derive(Debug, Clone, Copy)]
struct TokenBucket {
    /// Available tokens, kept within [0, capacity]
    tokens: f64,
    /// Clock reading of the last refill
    last_refill_ms: u64,
}

impl TokenBucket {
    fn full(config: &BucketConfig, now_ms: u64) -> Self {
        Self {
            tokens: f64::from(config.capacity),
            last_refill_ms: now_ms,
        }
    }

    /// Accrue tokens for the time since the last refill and move the refill
    /// mark to `now_ms`, whether or not the caller goes on to consume.
    fn refill(&mut self, config: &BucketConfig, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(self.last_refill_ms) as f64;
        let accrued = elapsed / config.window_ms as f64 * f64::from(config.refill_per_window);
        self.tokens = (self.tokens + accrued).min(f64::from(config.capacity));
        self.last_refill_ms = now_ms;
    }

    fn try_consume(&mut self) -> bool {
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn remaining(&self) -> u32 {
        self.tokens.floor() as u32
    }

    fn time_until_available(&self, config: &BucketConfig) -> Duration {
        if self.tokens >= 1.0 {
            return Duration::ZERO;
        }
        if config.refill_per_window == 0 {
            return config.window_duration();
        }
        let needed = 1.0 - self.tokens;
        let wait_ms = needed * config.window_ms as f64 / f64::from(config.refill_per_window);
        Duration::from_millis(wait_ms.ceil() as u64)
    }

    /// Clock reading at which the bucket is back at capacity. `u64::MAX`
    /// when it never refills.
    fn full_at_ms(&self, config: &BucketConfig) -> u64 {
        let missing = f64::from(config.capacity) - self.tokens;
        if missing <= 0.0 {
            return self.last_refill_ms;
        }
        if config.refill_per_window == 0 {
            return u64::MAX;
        }
        let wait_ms = missing * config.window_ms as f64 / f64::from(config.refill_per_window);
        self.last_refill_ms.saturating_add(wait_ms.ceil() as u64)
    }
}

/// Bucket table plus an index ordered by `full_at_ms`.
#[derive(Debug, Default)]
struct Buckets {
    by_key: HashMap<String, TokenBucket>,
    by_full_at: BTreeSet<(u64, String)>,
}

impl Buckets {
    fn insert(&mut self, config: &BucketConfig, key: &str, bucket: TokenBucket) {
        if let Some(previous) = self.by_key.insert(key.to_string(), bucket) {
            self.by_full_at
                .remove(&(previous.full_at_ms(config), key.to_string()));
        }
        self.by_full_at
            .insert((bucket.full_at_ms(config), key.to_string()));
    }

    /// Drop the bucket that refilled first, if it is full at `now_ms`.
    fn evict_one_full(&mut self, now_ms: u64) -> Option<String> {
        let (full_at, _) = self.by_full_at.first()?;
        if *full_at > now_ms {
            return None;
        }
        let (_, key) = self.by_full_at.pop_first()?;
        self.by_key.remove(&key);
        Some(key)
    }
}

/// In-memory, per-process token bucket limiter for one guarded surface.
#[derive(Debug)]
pub struct RateLimiter {
    config: BucketConfig,
    /// Full buckets idle for at least this many windows are dropped by `sweep`
    idle_windows: u32,
    /// Upper bound on live buckets
    max_buckets: Option<usize>,
    clock: Arc<dyn Clock>,
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    /// Create a limiter on the process monotonic clock.
    pub fn new(config: BucketConfig) -> Self {
        Self::with_clock(config, Arc::new(MonotonicClock::default()))
    }

    /// Create a limiter reading time from `clock`.
    pub fn with_clock(config: BucketConfig, clock: Arc<dyn Clock>) -> Self {
        let sweep = SweepConfig::default();
        Self {
            config,
            idle_windows: sweep.idle_windows,
            max_buckets: None,
            clock,
            buckets: Mutex::new(Buckets::default()),
        }
    }

    /// Apply eviction settings.
    pub fn with_sweep(mut self, sweep: &SweepConfig) -> Self {
        self.idle_windows = sweep.idle_windows.max(1);
        self.max_buckets = sweep.max_buckets.filter(|max| *max > 0);
        self
    }

    pub fn config(&self) -> &BucketConfig {
        &self.config
    }

    /// Take one token for `key`. Returns false when the bucket is empty.
    pub fn try_consume(&self, key: &str) -> bool {
        self.check(key).is_allowed()
    }

    /// Take one token for `key`, reporting what is left or how long to wait.
    ///
    /// A new key arriving while the table is at `max_buckets` with no full
    /// bucket to drop is denied rather than displacing a drained bucket.
    pub fn check(&self, key: &str) -> RateLimitResult {
        let now = self.clock.now_millis();
        let mut buckets = self.lock();

        let existing = buckets.by_key.get(key).copied();
        let mut bucket = match existing {
            Some(bucket) => bucket,
            None => {
                if let Err(retry_after) = self.make_room(&mut buckets, now) {
                    warn!(key, ?retry_after, "Bucket table full, refusing new key");
                    return RateLimitResult::Limited { retry_after };
                }
                TokenBucket::full(&self.config, now)
            }
        };

        bucket.refill(&self.config, now);
        let result = if bucket.try_consume() {
            RateLimitResult::Allowed {
                remaining: bucket.remaining(),
            }
        } else {
            let retry_after = bucket.time_until_available(&self.config);
            debug!(key, ?retry_after, "Bucket empty");
            RateLimitResult::Limited { retry_after }
        };
        buckets.insert(&self.config, key, bucket);
        result
    }

    /// Drop buckets that are back at capacity and have been idle for at
    /// least `idle_windows` windows. Returns the number of buckets evicted.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now_millis();
        let max_idle = self.config.window_ms.saturating_mul(u64::from(self.idle_windows));

        let mut buckets = self.lock();
        let Buckets { by_key, by_full_at } = &mut *buckets;

        let expired: Vec<(u64, String)> = by_full_at
            .iter()
            .take_while(|(full_at, _)| *full_at <= now)
            .filter(|(_, key)| {
                by_key
                    .get(key)
                    .is_some_and(|bucket| now.saturating_sub(bucket.last_refill_ms) >= max_idle)
            })
            .cloned()
            .collect();

        for entry in &expired {
            by_full_at.remove(entry);
            by_key.remove(&entry.1);
        }
        if !expired.is_empty() {
            debug!(evicted = expired.len(), live = by_key.len(), "Swept idle buckets");
        }
        expired.len()
    }

    /// Number of live buckets.
    pub fn len(&self) -> usize {
        self.lock().by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Free a slot for a new key. On failure returns how long until the
    /// first bucket is full and can be dropped.
    fn make_room(&self, buckets: &mut Buckets, now_ms: u64) -> Result<(), Duration> {
        let Some(max) = self.max_buckets else {
            return Ok(());
        };
        while buckets.by_key.len() >= max {
            match buckets.evict_one_full(now_ms) {
                Some(key) => debug!(key = %key, "Evicting full bucket at capacity"),
                None => {
                    let wait = match buckets.by_full_at.first() {
                        Some((full_at, _)) if *full_at != u64::MAX => {
                            Duration::from_millis(full_at.saturating_sub(now_ms).max(1))
                        }
                        _ => self.config.window_duration(),
                    };
                    return Err(wait);
                }
            }
        }
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, Buckets> {
        self.buckets.lock().unwrap_or_else(|e| e.into_inner())
    }
}
