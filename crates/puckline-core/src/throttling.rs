use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::{Clock, DefaultClock};
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::context::FetchContext;
use crate::error::ApiError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces outgoing upstream requests to a quota per window.
///
/// A pacer built with a zero limit never waits.
#[derive(Clone, Default)]
pub struct RequestPacer {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl std::fmt::Debug for RequestPacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestPacer")
            .field("enabled", &self.limiter.is_some())
            .finish()
    }
}

impl RequestPacer {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        if quota_limit == 0 || quota_window.is_zero() {
            return Self::unlimited();
        }
        let quota = quota_from_window(quota_window, quota_limit);
        Self {
            limiter: Some(Arc::new(RateLimiter::direct(quota))),
        }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.limiter.is_some()
    }

    /// Try to take budget without waiting. `Err` carries the time until the
    /// next request would be allowed.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        let Some(limiter) = &self.limiter else {
            return Ok(());
        };
        limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(DefaultClock::default().now()))
    }

    /// Wait for budget, giving up when the context ends.
    pub async fn acquire(&self, ctx: &FetchContext) -> Result<(), ApiError> {
        let Some(limiter) = &self.limiter else {
            return ctx.check();
        };
        ctx.run(limiter.until_ready()).await
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Quota {
    let burst = NonZeroU32::new(quota_limit.max(1)).unwrap_or(NonZeroU32::MIN);

    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);
    let period = Duration::from_secs_f64(seconds_per_cell);

    Quota::with_period(period)
        .unwrap_or_else(|| Quota::per_second(burst))
        .allow_burst(burst)
}
