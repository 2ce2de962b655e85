//! Token-bucket admission control for metered external APIs.
//!
//! One limiter per external service. `acquire()` never rejects, it only
//! delays. Callers block until a token is available, so the aggregate
//! outbound rate stays bounded no matter how fast the pipeline runs.

use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

pub struct RateLimiter {
    rate: f64,
    capacity: f64,
    state: Mutex<Bucket>,
}

struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// A limiter admitting `rate_per_sec` calls per second at steady
    /// state, tolerating bursts up to the same amount. Starts full.
    pub fn new(rate_per_sec: f64) -> Self {
        assert!(rate_per_sec > 0.0, "rate must be positive");
        Self {
            rate: rate_per_sec,
            capacity: rate_per_sec,
            state: Mutex::new(Bucket {
                tokens: rate_per_sec,
                last_refill: Instant::now(),
            }),
        }
    }

    /// Wait until one admission unit is available, then consume it.
    pub async fn acquire(&self) {
        loop {
            // Lock is released before sleeping; the refill math re-runs
            // on the next pass, so concurrent callers stay rate-bound
            // even though ordering between them is not guaranteed.
            let wait = {
                let mut bucket = self.state.lock().expect("limiter lock poisoned");
                let now = Instant::now();
                let elapsed = now.duration_since(bucket.last_refill).as_secs_f64();
                bucket.tokens = (bucket.tokens + elapsed * self.rate).min(self.capacity);
                bucket.last_refill = now;

                if bucket.tokens >= 1.0 {
                    bucket.tokens -= 1.0;
                    return;
                }
                Duration::from_secs_f64((1.0 - bucket.tokens) / self.rate)
            };
            tokio::time::sleep(wait).await;
        }
    }
}
