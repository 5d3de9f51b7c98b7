//! Guardrail Support Desk
//!
//! A customer support assistant whose every exchange passes through input and
//! output guardrails, with an HTML-first chat widget in front of it.
//!
//! # Architecture
//!
//! - **Server**: Axum routes for the support API and the htmx widget
//! - **Assistant**: conversation memory, guardrail chains and reprompting
//! - **Widget**: view-independent controller, rendered as HTML or driven from
//!   the terminal
//!
//! # Modules
//!
//! - [`assistant`]: guarded chat and query analysis
//! - [`guardrail`]: input and output guardrails
//! - [`llm`]: chat model trait and the Chat Completions driver
//! - [`widget`]: chat widget controller, transports and markup

// Allow pedantic clippy warnings that don't add value for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::missing_fields_in_debug)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::cargo_common_metadata)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::unused_async)]

pub mod assistant;
pub mod cli;
pub mod config;
pub mod error;
pub mod guardrail;
pub mod llm;
pub mod security;
pub mod server;
pub mod support;
pub mod types;
pub mod widget;

use crate::assistant::SupportAssistant;
use crate::config::AppConfig;
use crate::llm::ChatModel;
use crate::security::AppRateLimiter;
use crate::widget::{HostedWidget, LocalSupportApi};

use std::sync::Arc;

/// Application state shared across all handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Guarded support assistant behind the API.
    pub assistant: Arc<SupportAssistant>,
    /// Widget served at `/`, talking to `assistant` in-process.
    pub widget: Arc<HostedWidget>,
    /// Global Rate Limiter
    pub rate_limiter: Arc<AppRateLimiter>,
    /// Global Configuration
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, model: Arc<dyn ChatModel>) -> Self {
        let assistant = Arc::new(SupportAssistant::new(model, &config.guardrails));
        let widget = Arc::new(HostedWidget::new(LocalSupportApi::new(Arc::clone(
            &assistant,
        ))));
        let rate_limiter = Arc::new(AppRateLimiter::new(
            config.resilience.requests_per_second,
            config.resilience.burst_size,
        ));
        Self {
            assistant,
            widget,
            rate_limiter,
            config,
        }
    }
}
