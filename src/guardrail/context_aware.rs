//! Per-session burst limiting and repeated-question detection.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use super::{GuardrailResult, InputContext, InputGuardrail, message_bucket};

const MAX_REQUESTS_PER_MINUTE: usize = 20;
const MAX_SIMILAR_QUESTIONS: usize = 3;
const SIMILARITY_THRESHOLD: f64 = 0.8;
const MAX_RECENT_QUESTIONS: usize = 10;
const SESSION_BUCKETS: u64 = 1000;
const WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Default)]
struct SessionActivity {
    request_times: VecDeque<Instant>,
    recent_questions: VecDeque<String>,
}

#[derive(Debug, Default)]
pub struct ContextAwareGuardrail {
    sessions: Mutex<HashMap<u64, SessionActivity>>,
}

/// Jaccard similarity over lowercase whitespace-separated words.
pub fn jaccard_similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let left: std::collections::HashSet<&str> = a.split_whitespace().collect();
    let right: std::collections::HashSet<&str> = b.split_whitespace().collect();

    let union = left.union(&right).count();
    if union == 0 {
        return 0.0;
    }
    let intersection = left.intersection(&right).count();
    intersection as f64 / union as f64
}

impl ContextAwareGuardrail {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn validate_at(&self, text: &str, now: Instant) -> GuardrailResult {
        let session_id = message_bucket(text, SESSION_BUCKETS);
        let mut sessions = self
            .sessions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let session = sessions.entry(session_id).or_default();

        while session
            .request_times
            .front()
            .is_some_and(|t| now.saturating_duration_since(*t) >= WINDOW)
        {
            session.request_times.pop_front();
        }
        if session.request_times.len() >= MAX_REQUESTS_PER_MINUTE {
            tracing::warn!(
                name: "guardrail.context.rate_limited",
                session = session_id,
                "Rate limit exceeded for session"
            );
            return GuardrailResult::failure(
                "You're sending messages too quickly. Please wait a moment before trying again.",
            );
        }
        session.request_times.push_back(now);

        let similar = session
            .recent_questions
            .iter()
            .filter(|q| jaccard_similarity(q, text) > SIMILARITY_THRESHOLD)
            .count();
        if similar >= MAX_SIMILAR_QUESTIONS {
            tracing::info!(
                name: "guardrail.context.repetitive",
                session = session_id,
                "Repetitive question detected for session"
            );
            return GuardrailResult::failure(
                "You've asked similar questions multiple times. Please try rephrasing your question or asking about a different topic.",
            );
        }

        if session.recent_questions.len() == MAX_RECENT_QUESTIONS {
            session.recent_questions.pop_front();
        }
        session.recent_questions.push_back(text.to_string());
        GuardrailResult::Success
    }
}

impl InputGuardrail for ContextAwareGuardrail {
    fn name(&self) -> &'static str {
        "ContextAwareInputGuardrail"
    }

    fn validate(&self, input: &InputContext<'_>) -> GuardrailResult {
        self.validate_at(input.text, Instant::now())
    }
}
