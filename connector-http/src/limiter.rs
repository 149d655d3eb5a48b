//! Token-bucket rate limiting keyed by provider and credential identity.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use connector_manifest::RateLimit;
use connector_primitives::ProviderId;
use tokio::time::{Instant, sleep};

use crate::error::{ExecutionError, ExecutionResult};

/// Bucket key: one bucket per provider and credential identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    provider: ProviderId,
    identity: String,
}

impl RateLimitKey {
    /// Creates a key.
    #[must_use]
    pub fn new(provider: ProviderId, identity: impl Into<String>) -> Self {
        Self {
            provider,
            identity: identity.into(),
        }
    }

    /// Provider part of the key.
    #[must_use]
    pub fn provider(&self) -> &ProviderId {
        &self.provider
    }
}

/// Limiter state store.
///
/// The in-process [`TokenBucketLimiter`] is enough for a single instance;
/// deployments spanning several instances should implement this trait over a
/// shared counter store.
pub trait RateLimiter: Send + Sync {
    /// Atomically checks and consumes one permit.
    ///
    /// # Errors
    ///
    /// Returns the time until a permit becomes available when the bucket is
    /// empty. No permit is consumed in that case.
    fn try_acquire(&self, key: &RateLimitKey, limit: RateLimit) -> Result<(), Duration>;
}

/// How often idle buckets are swept.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    capacity: f64,
    per_second: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn tokens_at(&self, now: Instant) -> f64 {
        let elapsed = now.saturating_duration_since(self.refilled_at);
        (self.tokens + elapsed.as_secs_f64() * self.per_second).min(self.capacity)
    }
}

#[derive(Debug, Default)]
struct Buckets {
    by_key: HashMap<RateLimitKey, Bucket>,
    swept_at: Option<Instant>,
}

impl Buckets {
    /// Drops buckets that have refilled completely. A full bucket behaves
    /// exactly like a fresh one.
    fn sweep(&mut self, now: Instant) {
        if self
            .swept_at
            .is_some_and(|at| now.saturating_duration_since(at) < SWEEP_INTERVAL)
        {
            return;
        }
        self.by_key.retain(|_, bucket| bucket.tokens_at(now) < bucket.capacity);
        self.swept_at = Some(now);
    }
}

/// In-process token buckets guarded by a single mutex. Idle buckets are
/// dropped once they refill.
#[derive(Debug, Default)]
pub struct TokenBucketLimiter {
    buckets: Mutex<Buckets>,
}

impl TokenBucketLimiter {
    /// Creates an empty limiter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn bucket_count(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).by_key.len()
    }
}

impl RateLimiter for TokenBucketLimiter {
    #[allow(clippy::cast_precision_loss)]
    fn try_acquire(&self, key: &RateLimitKey, limit: RateLimit) -> Result<(), Duration> {
        let capacity = f64::from(limit.requests);
        let per_second = capacity / limit.window_seconds as f64;
        let now = Instant::now();

        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        buckets.sweep(now);
        let bucket = buckets.by_key.entry(key.clone()).or_insert(Bucket {
            tokens: capacity,
            capacity,
            per_second,
            refilled_at: now,
        });
        bucket.capacity = capacity;
        bucket.per_second = per_second;

        bucket.tokens = bucket.tokens_at(now);
        bucket.refilled_at = now;

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - bucket.tokens) / per_second))
        }
    }
}

/// Acquires a permit, waiting at most `max_wait` for one.
///
/// # Errors
///
/// Returns [`ExecutionError::RateLimited`] with the remaining wait when a
/// permit will not be available within `max_wait`.
pub(crate) async fn acquire(
    limiter: &dyn RateLimiter,
    key: &RateLimitKey,
    limit: RateLimit,
    max_wait: Duration,
) -> ExecutionResult<()> {
    let deadline = Instant::now() + max_wait;
    loop {
        match limiter.try_acquire(key, limit) {
            Ok(()) => return Ok(()),
            Err(wait) => {
                if Instant::now() + wait > deadline {
                    return Err(ExecutionError::RateLimited {
                        provider: key.provider().to_string(),
                        retry_after: Some(wait),
                    });
                }
                sleep(wait).await;
            }
        }
    }
}
