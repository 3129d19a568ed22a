//! Rate Limiter: a keyed token-bucket store. Hand-rolled rather than built
//! on `governor` (its API doesn't expose a `retry_after` in matching units
//! for the exact per-scope formulas needed here); the
//! keyed-registry-behind-a-`Mutex` shape is grounded on
//! `warpgate-core/src/rate_limiting/registry.rs`.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Bucket {
    tokens: f64,
    capacity: f64,
    rate_per_second: f64,
    last_refill: Instant,
    last_access: Instant,
}

impl Bucket {
    fn new(rate_per_second: f64, burst: Option<f64>, burst_multiplier: f64) -> Self {
        let capacity = burst.unwrap_or_else(|| (rate_per_second * burst_multiplier).ceil());
        let now = Instant::now();
        Self {
            tokens: capacity,
            capacity,
            rate_per_second,
            last_refill: now,
            last_access: now,
        }
    }

    /// Refills, then attempts to deduct one token. Returns `(allowed,
    /// retry_after_seconds)`.
    fn check(&mut self) -> (bool, f64) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate_per_second).min(self.capacity);
        self.last_refill = now;
        self.last_access = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            (true, 0.0)
        } else {
            let retry_after = (1.0 - self.tokens) / self.rate_per_second;
            (false, retry_after)
        }
    }

    fn idle_for(&self) -> Duration {
        Instant::now().duration_since(self.last_access)
    }
}

const IDLE_EVICTION: Duration = Duration::from_secs(300);

pub struct RateLimiterRegistry {
    buckets: Mutex<HashMap<String, Bucket>>,
    burst_multiplier: f64,
}

pub struct CheckResult {
    pub allowed: bool,
    pub retry_after_secs: f64,
}

impl RateLimiterRegistry {
    pub fn new(burst_multiplier: f64) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            burst_multiplier,
        }
    }

    pub async fn check(&self, key: &str, rate_per_second: f64, burst: Option<f64>) -> CheckResult {
        let mut buckets = self.buckets.lock().await;
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::new(rate_per_second, burst, self.burst_multiplier));
        let (allowed, retry_after_secs) = bucket.check();
        CheckResult {
            allowed,
            retry_after_secs,
        }
    }

    /// Periodic sweep (every 60 s wall time) evicting
    /// buckets idle more than 300 s.
    pub async fn sweep_idle(&self) {
        let mut buckets = self.buckets.lock().await;
        buckets.retain(|_, bucket| bucket.idle_for() < IDLE_EVICTION);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_burst_then_limits() {
        let registry = RateLimiterRegistry::new(1.5);
        for _ in 0..15 {
            let result = registry.check("global:127.0.0.1", 10.0, Some(15.0)).await;
            assert!(result.allowed);
        }
        let result = registry.check("global:127.0.0.1", 10.0, Some(15.0)).await;
        assert!(!result.allowed);
        assert!(result.retry_after_secs > 0.0);
    }

    #[tokio::test]
    async fn tokens_stay_within_capacity_bounds() {
        let registry = RateLimiterRegistry::new(1.5);
        let _ = registry.check("k", 5.0, None).await;
        let buckets = registry.buckets.lock().await;
        let bucket = buckets.get("k").unwrap();
        assert!(bucket.tokens >= 0.0 && bucket.tokens <= bucket.capacity);
    }
}
