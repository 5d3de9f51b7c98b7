use axum::{
    Form, Json, Router,
    extract::{OriginalUri, Request, State, rejection::JsonRejection},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use tower_http::trace::TraceLayer;

use tracing::info;

use crate::AppState;
use crate::config::AppConfig;
use crate::error::ApiError;
use crate::llm::ChatModel;
use crate::security::rate_limit_middleware;
use crate::support;
use crate::types::ChatRequest;
use crate::widget::render;

/// Start the Axum server with the provided configuration.
pub async fn start_server(config: Arc<AppConfig>, model: Arc<dyn ChatModel>) -> anyhow::Result<()> {
    let state = AppState::new(Arc::clone(&config), model);
    let app = build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        name: "server.started",
        address = %addr,
        rate_limit_enabled = config.resilience.rate_limit_enabled,
        "Server started"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}

/// All routes with tracing, timeouts and the global limiter on `/api`.
pub fn build_router(state: AppState) -> Router {
    let timeout_duration = state.config.request_timeout();
    let widget_timeout_duration = state.config.widget_timeout();

    let api = Router::new()
        .route("/api/support/chat", post(api_chat))
        .route("/api/support/analyze", post(api_analyze))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            rate_limit_middleware,
        ));

    // htmx fragments; a timeout re-renders the widget instead of a bare 408.
    let widget = Router::new()
        .route("/widget/send", post(widget_send))
        .route("/widget/analyze", post(widget_analyze))
        .route("/widget/input", post(widget_input))
        .route("/widget/example", post(widget_example))
        .route("/widget/banner", get(widget_banner))
        .route("/widget/hint", get(widget_hint))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            move |state: State<AppState>, req: Request, next: Next| async move {
                widget_timeout(widget_timeout_duration, state, req, next).await
            },
        ));

    let pages = Router::new()
        .merge(api)
        .route("/health", get(health))
        .route("/", get(index_handler))
        .layer(axum::middleware::from_fn(
            move |req: Request, next: Next| async move {
                request_timeout(timeout_duration, req, next).await
            },
        ));

    Router::new()
        .merge(pages)
        .merge(widget)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn request_timeout(duration: Duration, req: Request, next: Next) -> Response {
    match tokio::time::timeout(duration, next.run(req)).await {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(
                name: "http.request.timeout",
                timeout_secs = duration.as_secs(),
                "Request timed out"
            );
            (StatusCode::REQUEST_TIMEOUT, "Request timed out").into_response()
        }
    }
}

/// The dropped submit has already settled the widget; show that state.
async fn widget_timeout(
    duration: Duration,
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    let result = tokio::time::timeout(duration, next.run(req)).await;
    match result {
        Ok(res) => res,
        Err(_) => {
            tracing::warn!(
                name: "http.widget.timeout",
                timeout_secs = duration.as_secs(),
                "Widget request timed out"
            );
            Html(render::widget(&state.widget.view())).into_response()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// POST /api/support/chat
async fn api_chat(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Json(req) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            return ApiError::InvalidRequest {
                path: uri.path().to_string(),
                detail: rejection.body_text(),
            }
            .into_response();
        }
    };

    info!(
        name: "support.chat.received",
        chars = req.message.chars().count(),
        "Received chat request"
    );

    let (status, body) = support::chat_reply(&state.assistant, &req.message).await;
    (status, Json(body)).into_response()
}

/// POST /api/support/analyze - 400 with an empty body on any failure.
async fn api_analyze(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Response {
    let Ok(Json(req)) = payload else {
        return StatusCode::BAD_REQUEST.into_response();
    };

    info!(
        name: "support.analyze.received",
        chars = req.message.chars().count(),
        "Received analysis request"
    );

    match support::analyze_reply(&state.assistant, &req.message).await {
        Ok(analysis) => Json(analysis).into_response(),
        Err(status) => status.into_response(),
    }
}

/// GET /health
async fn health() -> &'static str {
    "ok"
}

// ─────────────────────────────────────────────────────────────────────────────
// HTML Page Handlers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct MessageForm {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ExampleForm {
    example: String,
    #[serde(default)]
    dangerous: bool,
}

/// GET / - loading the page starts a fresh widget.
async fn index_handler(State(state): State<AppState>) -> Html<String> {
    state.widget.reset();
    Html(render::page(&state.widget.view()))
}

/// POST /widget/send
async fn widget_send(State(state): State<AppState>, Form(form): Form<MessageForm>) -> Html<String> {
    // Kept on rejection, cleared once the message is sent.
    state.widget.input_changed(&form.message);
    state.widget.submit_chat_message(&form.message).await;
    Html(render::widget(&state.widget.view()))
}

/// POST /widget/analyze
async fn widget_analyze(
    State(state): State<AppState>,
    Form(form): Form<MessageForm>,
) -> Html<String> {
    // The draft stays in the box after an analysis.
    state.widget.input_changed(&form.message);
    state.widget.submit_analysis_request(&form.message).await;
    Html(render::widget(&state.widget.view()))
}

/// POST /widget/input - returns the character counter.
async fn widget_input(State(state): State<AppState>, Form(form): Form<MessageForm>) -> Html<String> {
    let counter = state.widget.input_changed(&form.message);
    Html(render::counter(&counter))
}

/// POST /widget/example
async fn widget_example(
    State(state): State<AppState>,
    Form(form): Form<ExampleForm>,
) -> Html<String> {
    state.widget.select_example(&form.example, form.dangerous);
    Html(render::widget(&state.widget.view()))
}

/// GET /widget/banner
async fn widget_banner(State(state): State<AppState>) -> Html<String> {
    Html(render::banner(state.widget.view().banner.as_deref()))
}

/// GET /widget/hint
async fn widget_hint(State(state): State<AppState>) -> Html<String> {
    Html(render::hint(state.widget.view().hint.as_ref()))
}
