//! The chat widget's behaviour, independent of how it is drawn.
//!
//! State lives behind a mutex that is never held across a request, so
//! overlapping submits are allowed: each one appends its own bubbles when it
//! resolves, in whatever order the responses arrive.
//!
//! A chat submit that is dropped before its response arrives (a timed-out or
//! disconnected request) still settles as a connection failure, so the typing
//! indicator always ends.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::time::Instant;

use super::model::{
    ANALYSIS_CONNECTION_BANNER, ANALYSIS_FAILED_BANNER, AnalysisField, BANNER_TTL,
    CHAT_ERROR_FALLBACK, CONNECTION_BANNER, CONNECTION_FALLBACK, CharCounter, ChatMessage,
    HINT_TTL, Hint, ValidationError, analysis_fields, validate_analysis_query,
    validate_chat_message,
};
use super::transport::{AnalyzeOutcome, SupportApi};
use crate::types::ChatResponse;

/// What became of a submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Failed local validation; nothing was sent.
    Rejected(ValidationError),
    /// The server accepted the request.
    Delivered,
    /// The server answered with a failure.
    ApplicationError(String),
    /// No usable answer came back.
    TransportError,
}

#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T: Clone> Expiring<T> {
    fn new(value: T, ttl: std::time::Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    fn live(&self, now: Instant) -> Option<T> {
        (now < self.expires_at).then(|| self.value.clone())
    }
}

#[derive(Debug, Default)]
struct WidgetState {
    messages: Vec<ChatMessage>,
    pending_chats: usize,
    banner: Option<Expiring<String>>,
    hint: Option<Expiring<Hint>>,
    analysis: Option<Vec<AnalysisField>>,
    input: String,
    message_count: u64,
    guardrail_count: u64,
    /// Bumped on every reset; answers to requests from before it are dropped.
    epoch: u64,
}

impl WidgetState {
    fn show_banner(&mut self, text: impl Into<String>) {
        self.banner = Some(Expiring::new(text.into(), BANNER_TTL));
    }
}

fn lock(state: &Mutex<WidgetState>) -> MutexGuard<'_, WidgetState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A chat message shown as sent whose answer has not been recorded yet.
#[derive(Debug)]
struct PendingChat<'a> {
    state: &'a Mutex<WidgetState>,
    epoch: u64,
    settled: bool,
}

impl<'a> PendingChat<'a> {
    /// Take the state to record the answer, or `None` after a reset.
    fn settle(mut self) -> Option<MutexGuard<'a, WidgetState>> {
        self.settled = true;
        let mut state = lock(self.state);
        if state.epoch != self.epoch {
            return None;
        }
        state.pending_chats = state.pending_chats.saturating_sub(1);
        Some(state)
    }
}

impl Drop for PendingChat<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut state = lock(self.state);
        if state.epoch != self.epoch {
            return;
        }
        tracing::warn!(
            name: "widget.chat.abandoned",
            "Chat request dropped before it resolved"
        );
        state.pending_chats = state.pending_chats.saturating_sub(1);
        state.messages.push(ChatMessage::bot_error(CONNECTION_FALLBACK));
        state.show_banner(CONNECTION_BANNER);
    }
}

/// Point-in-time copy of everything the widget displays.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub messages: Vec<ChatMessage>,
    pub typing: bool,
    pub banner: Option<String>,
    pub hint: Option<Hint>,
    /// `None` until an analysis succeeds; the panel is hidden until then.
    pub analysis: Option<Vec<AnalysisField>>,
    pub input: String,
    pub counter: CharCounter,
    pub message_count: u64,
    pub guardrail_count: u64,
}

/// Drives one chat widget against a [`SupportApi`].
#[derive(Debug)]
pub struct ChatWidgetController<A> {
    api: A,
    state: Mutex<WidgetState>,
}

impl<A: SupportApi> ChatWidgetController<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: Mutex::default(),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    fn state(&self) -> MutexGuard<'_, WidgetState> {
        lock(&self.state)
    }

    /// Validate, send and record a chat message.
    pub async fn submit_chat_message(&self, text: &str) -> SubmitOutcome {
        let message = match validate_chat_message(text) {
            Ok(message) => message,
            Err(err) => return self.reject(err),
        };

        let pending = {
            let mut state = self.state();
            state.banner = None;
            state.messages.push(ChatMessage::user(message));
            state.input.clear();
            state.pending_chats += 1;
            state.message_count += 1;
            state.guardrail_count += 1;
            PendingChat {
                state: &self.state,
                epoch: state.epoch,
                settled: false,
            }
        };

        let result = self.api.chat(message).await;

        let (outcome, bubble, banner) = match result {
            Ok(ChatResponse {
                success: true,
                response: Some(text),
                ..
            }) => (SubmitOutcome::Delivered, ChatMessage::bot(text), None),
            Ok(ChatResponse {
                success: false,
                error,
                ..
            }) => {
                let error = error
                    .filter(|e| !e.is_empty())
                    .unwrap_or_else(|| CHAT_ERROR_FALLBACK.to_string());
                tracing::info!(
                    name: "widget.chat.rejected",
                    error = %error,
                    "Chat request rejected by server"
                );
                (
                    SubmitOutcome::ApplicationError(error.clone()),
                    ChatMessage::bot_error(error.clone()),
                    Some(error),
                )
            }
            Ok(ChatResponse { response: None, .. }) => {
                tracing::warn!(
                    name: "widget.chat.transport_failed",
                    error = "successful response without a reply",
                    "Chat request failed"
                );
                Self::connection_failure()
            }
            Err(err) => {
                tracing::warn!(
                    name: "widget.chat.transport_failed",
                    error = %err,
                    "Chat request failed"
                );
                Self::connection_failure()
            }
        };

        if let Some(mut state) = pending.settle() {
            state.messages.push(bubble);
            if let Some(banner) = banner {
                state.show_banner(banner);
            }
        }
        outcome
    }

    fn connection_failure() -> (SubmitOutcome, ChatMessage, Option<String>) {
        (
            SubmitOutcome::TransportError,
            ChatMessage::bot_error(CONNECTION_FALLBACK),
            Some(CONNECTION_BANNER.to_string()),
        )
    }

    /// Validate and send an analysis request, filling the panel on success.
    pub async fn submit_analysis_request(&self, text: &str) -> SubmitOutcome {
        let query = match validate_analysis_query(text) {
            Ok(query) => query,
            Err(err) => return self.reject(err),
        };

        let epoch = {
            let mut state = self.state();
            state.banner = None;
            state.guardrail_count += 1;
            state.epoch
        };

        let result = self.api.analyze(query).await;

        let mut state = self.state();
        // A reset in the meantime started a new page; leave it untouched.
        let current = state.epoch == epoch;
        match result {
            Ok(AnalyzeOutcome::Analysis(analysis)) => {
                if current {
                    state.analysis = Some(analysis_fields(&analysis));
                }
                SubmitOutcome::Delivered
            }
            Ok(AnalyzeOutcome::Rejected(status)) => {
                tracing::info!(
                    name: "widget.analyze.rejected",
                    status,
                    "Analysis request rejected by server"
                );
                if current {
                    state.show_banner(ANALYSIS_FAILED_BANNER);
                }
                SubmitOutcome::ApplicationError(ANALYSIS_FAILED_BANNER.to_string())
            }
            Err(err) => {
                tracing::warn!(
                    name: "widget.analyze.transport_failed",
                    error = %err,
                    "Analysis request failed"
                );
                if current {
                    state.show_banner(ANALYSIS_CONNECTION_BANNER);
                }
                SubmitOutcome::TransportError
            }
        }
    }

    fn reject(&self, err: ValidationError) -> SubmitOutcome {
        self.state().show_banner(err.to_string());
        SubmitOutcome::Rejected(err)
    }

    /// Record the draft and return the updated counter.
    pub fn input_changed(&self, text: &str) -> CharCounter {
        text.clone_into(&mut self.state().input);
        CharCounter::for_input(text)
    }

    /// Put an example in the input and show the matching hint.
    pub fn select_example(&self, example: &str, dangerous: bool) {
        let mut state = self.state();
        example.clone_into(&mut state.input);
        state.hint = Some(Expiring::new(Hint::for_example(dangerous), HINT_TTL));
    }

    /// Back to a freshly loaded page.
    pub fn reset(&self) {
        let mut state = self.state();
        let epoch = state.epoch + 1;
        *state = WidgetState {
            epoch,
            ..WidgetState::default()
        };
    }

    pub fn view(&self) -> WidgetView {
        let now = Instant::now();
        let state = self.state();
        WidgetView {
            messages: state.messages.clone(),
            typing: state.pending_chats > 0,
            banner: state.banner.as_ref().and_then(|b| b.live(now)),
            hint: state.hint.as_ref().and_then(|h| h.live(now)),
            analysis: state.analysis.clone(),
            input: state.input.clone(),
            counter: CharCounter::for_input(&state.input),
            message_count: state.message_count,
            guardrail_count: state.guardrail_count,
        }
    }
}
