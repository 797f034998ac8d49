//! Per-domain rate limiting.
//!
//! One keyed limiter shared by every retrieval tier: before a request to a
//! host, the caller waits until `1/rate_limit` seconds have passed since
//! the previous request to that same host. The limiter is internally
//! synchronized, so concurrent pipeline runs hitting the same host queue
//! up correctly.

use std::sync::Arc;
use std::time::Duration;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;

/// Keyed (per-host) rate limiter.
#[derive(Clone)]
pub struct DomainRateLimiter {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl DomainRateLimiter {
    /// One request per `1/requests_per_second` seconds, per host.
    /// Non-positive rates disable limiting.
    pub fn new(requests_per_second: f64) -> Self {
        if requests_per_second <= 0.0 {
            return Self { limiter: None };
        }
        let period = Duration::from_secs_f64(1.0 / requests_per_second);
        let quota = Quota::with_period(period)
            .expect("period must be non-zero")
            .allow_burst(nonzero!(1u32));
        Self {
            limiter: Some(Arc::new(RateLimiter::keyed(quota))),
        }
    }

    /// Wait until a request to `host` is allowed.
    pub async fn acquire(&self, host: &str) {
        if let Some(limiter) = &self.limiter {
            limiter.until_key_ready(&host.to_string()).await;
        }
    }
}
