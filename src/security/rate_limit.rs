use crate::AppState;
use crate::error::ApiError;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;

/// Global token bucket in front of the support API.
///
/// Not keyed by client; every request draws from the same bucket. Per-user
/// limits live in the rate limiting guardrail.
pub struct AppRateLimiter {
    inner: DefaultDirectRateLimiter,
}

impl std::fmt::Debug for AppRateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppRateLimiter").finish_non_exhaustive()
    }
}

impl AppRateLimiter {
    /// `requests_per_second` refill rate, up to `burst_size` tokens banked.
    /// Zero values are raised to one.
    pub fn new(requests_per_second: u32, burst_size: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst_size).unwrap_or(NonZeroU32::MIN);
        Self {
            inner: RateLimiter::direct(Quota::per_second(rate).allow_burst(burst)),
        }
    }

    /// Take a token if one is available.
    pub fn check(&self) -> bool {
        self.inner.check().is_ok()
    }
}

/// Middleware to enforce the global limit
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if state.config.resilience.rate_limit_enabled && !state.rate_limiter.check() {
        return Err(ApiError::RateLimited {
            path: req.uri().path().to_string(),
        });
    }
    Ok(next.run(req).await)
}
