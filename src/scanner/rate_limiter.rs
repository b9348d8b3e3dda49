//! Rate limiting for network scans.
//!
//! Provides token bucket rate limiting to pace probe dispatch.

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as GovLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

/// A rate limiter capping how many probes start per second.
///
/// Uses a token bucket with a burst of one, so probes are spread evenly
/// instead of starting in clumps at each second boundary.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    rate: NonZeroU32,
}

impl RateLimiter {
    /// Create a new rate limiter allowing `rate` probes per second.
    pub fn new(rate: NonZeroU32) -> Self {
        let quota = Quota::per_second(rate).allow_burst(NonZeroU32::MIN);
        Self {
            limiter: Arc::new(GovLimiter::direct(quota)),
            rate,
        }
    }

    /// Wait until a token is available.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Configured probes per second.
    pub fn rate(&self) -> NonZeroU32 {
        self.rate
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").field("rate", &self.rate).finish()
    }
}
