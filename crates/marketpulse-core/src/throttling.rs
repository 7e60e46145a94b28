use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces upstream batch calls so at most one starts per `spacing`.
///
/// The first permit is granted immediately; each later one waits until the
/// spacing has elapsed since the previous permit. A zero spacing disables pacing.
#[derive(Clone)]
pub struct BatchThrottle {
    limiter: Option<Arc<DirectRateLimiter>>,
    spacing: Duration,
}

impl BatchThrottle {
    pub fn new(spacing: Duration) -> Self {
        let limiter = Quota::with_period(spacing).map(|quota| Arc::new(RateLimiter::direct(quota)));
        Self { limiter, spacing }
    }

    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Returns `true` when a batch may start right now without waiting.
    pub fn try_acquire(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }

    /// Waits until the next batch may start.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

impl std::fmt::Debug for BatchThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchThrottle")
            .field("spacing", &self.spacing)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_batch_must_wait_for_spacing() {
        let throttle = BatchThrottle::new(Duration::from_secs(60));

        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[test]
    fn zero_spacing_never_blocks() {
        let throttle = BatchThrottle::disabled();

        assert!(!throttle.is_enabled());
        for _ in 0..10 {
            assert!(throttle.try_acquire());
        }
    }

    #[tokio::test]
    async fn acquire_waits_out_the_spacing() {
        let throttle = BatchThrottle::new(Duration::from_millis(40));
        let started = std::time::Instant::now();

        throttle.acquire().await;
        throttle.acquire().await;

        assert!(started.elapsed() >= Duration::from_millis(30));
    }
}
