//! Sliding-window request limits per (pseudo) user.
//!
//! Two windows are enforced: requests in the last minute and in the last
//! hour. Timestamps older than an hour are dropped lazily on each check, and
//! idle users are swept out every [`CLEANUP_INTERVAL`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{GuardrailResult, InputContext, InputGuardrail, message_bucket};

pub const MAX_REQUESTS_PER_MINUTE: usize = 30;
pub const MAX_REQUESTS_PER_HOUR: usize = 200;
const CLEANUP_INTERVAL: Duration = Duration::from_secs(5 * 60);
const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(60 * 60);
const USER_BUCKETS: u64 = 10_000;

#[derive(Debug)]
struct Limits {
    users: HashMap<u64, VecDeque<Instant>>,
    last_cleanup: Instant,
}

#[derive(Debug)]
pub struct RateLimitingGuardrail {
    limits: Mutex<Limits>,
}

impl Default for RateLimitingGuardrail {
    fn default() -> Self {
        Self::new()
    }
}

fn prune(requests: &mut VecDeque<Instant>, now: Instant) {
    while requests
        .front()
        .is_some_and(|t| now.saturating_duration_since(*t) >= HOUR)
    {
        requests.pop_front();
    }
}

fn in_last_minute(requests: &VecDeque<Instant>, now: Instant) -> usize {
    requests
        .iter()
        .filter(|t| now.saturating_duration_since(**t) < MINUTE)
        .count()
}

impl RateLimitingGuardrail {
    pub fn new() -> Self {
        Self {
            limits: Mutex::new(Limits {
                users: HashMap::new(),
                last_cleanup: Instant::now(),
            }),
        }
    }

    /// Number of users currently tracked.
    pub fn tracked_users(&self) -> usize {
        self.limits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .users
            .len()
    }

    pub(crate) fn validate_at(&self, text: &str, now: Instant) -> GuardrailResult {
        let user = message_bucket(text, USER_BUCKETS);
        let mut limits = self
            .limits
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);

        if now.saturating_duration_since(limits.last_cleanup) > CLEANUP_INTERVAL {
            limits.users.retain(|_, requests| {
                prune(requests, now);
                !requests.is_empty()
            });
            limits.last_cleanup = now;
            tracing::debug!(
                name: "guardrail.rate_limit.cleanup",
                active_users = limits.users.len(),
                "Cleaned up rate limit entries"
            );
        }

        let requests = limits.users.entry(user).or_default();
        prune(requests, now);

        let last_minute = in_last_minute(requests, now);
        if last_minute >= MAX_REQUESTS_PER_MINUTE {
            tracing::warn!(
                name: "guardrail.rate_limit.minute",
                user,
                requests = last_minute,
                "Rate limit exceeded for user"
            );
            return GuardrailResult::failure(format!(
                "Rate limit exceeded. You can make up to {MAX_REQUESTS_PER_MINUTE} requests per minute. Please wait before sending another message."
            ));
        }

        if requests.len() >= MAX_REQUESTS_PER_HOUR {
            tracing::warn!(
                name: "guardrail.rate_limit.hour",
                user,
                requests = requests.len(),
                "Hourly rate limit exceeded for user"
            );
            return GuardrailResult::failure(format!(
                "Hourly rate limit exceeded. You can make up to {MAX_REQUESTS_PER_HOUR} requests per hour. Please try again later."
            ));
        }

        requests.push_back(now);
        GuardrailResult::Success
    }
}

impl InputGuardrail for RateLimitingGuardrail {
    fn name(&self) -> &'static str {
        "RateLimitingGuardrail"
    }

    fn validate(&self, input: &InputContext<'_>) -> GuardrailResult {
        self.validate_at(input.text, Instant::now())
    }
}
