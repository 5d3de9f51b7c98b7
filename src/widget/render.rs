//! HTML fragments for the htmx front-end.
//!
//! Every fragment is a plain `String`; the widget root is re-rendered after
//! each action and swapped in place with `hx-swap="outerHTML"`.

use std::fmt::Write as _;

use super::controller::WidgetView;
use super::model::{
    AnalysisField, BANNER_TTL, CharCounter, ChatMessage, EXAMPLES, HINT_TTL, Hint, HintKind,
    MAX_MESSAGE_CHARS, Role,
};

/// Escape `& < > " '` for use in text and attribute values.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Transcript
// ─────────────────────────────────────────────────────────────────────────────

pub fn message(msg: &ChatMessage) -> String {
    let text = escape_html(&msg.text);
    match msg.role {
        Role::User => format!(
            r#"<div class="message user"><div class="message-content">{text}</div><div class="message-avatar">You</div></div>"#
        ),
        Role::Bot if msg.is_error => format!(
            r#"<div class="message bot"><div class="message-avatar">Bot</div><div class="message-content error-message"><span class="icon" aria-hidden="true">!</span> {text}</div></div>"#
        ),
        Role::Bot => format!(
            r#"<div class="message bot"><div class="message-avatar">Bot</div><div class="message-content">{text}</div></div>"#
        ),
    }
}

fn transcript(view: &WidgetView) -> String {
    let mut html = String::from(r#"<div id="chatContainer" class="chat-container">"#);
    for msg in &view.messages {
        html.push_str(&message(msg));
    }
    // Shown by htmx while a send is in flight, and by the view for any
    // request still pending elsewhere.
    let typing_class = if view.typing {
        "typing-indicator visible"
    } else {
        "typing-indicator htmx-indicator"
    };
    let _ = write!(
        html,
        r#"<div id="typingIndicator" class="{typing_class}"><span></span><span></span><span></span></div></div>"#
    );
    html
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner, hint, counter, stats
// ─────────────────────────────────────────────────────────────────────────────

/// Error banner. When showing, it re-fetches itself once the banner expires.
pub fn banner(text: Option<&str>) -> String {
    match text {
        Some(text) => format!(
            r#"<div id="errorContainer" hx-get="/widget/banner" hx-trigger="load delay:{}ms" hx-swap="outerHTML"><div class="error-message"><span class="icon" aria-hidden="true">!</span> {}</div></div>"#,
            BANNER_TTL.as_millis(),
            escape_html(text)
        ),
        None => r#"<div id="errorContainer"></div>"#.to_string(),
    }
}

/// Example hint. Re-fetches itself once the hint expires.
pub fn hint(hint: Option<&Hint>) -> String {
    match hint {
        Some(hint) => {
            let icon = match hint.kind {
                HintKind::Warning => "⚠",
                HintKind::Success => "✓",
            };
            format!(
                r#"<div id="hint" hx-get="/widget/hint" hx-trigger="load delay:{}ms" hx-swap="outerHTML"><div class="{}">{icon} {}</div></div>"#,
                HINT_TTL.as_millis(),
                hint.kind.classes(),
                escape_html(hint.text)
            )
        }
        None => r#"<div id="hint"></div>"#.to_string(),
    }
}

pub fn counter(counter: &CharCounter) -> String {
    format!(
        r#"<small id="charCount" class="{}">{}</small>"#,
        counter.tone.classes(),
        escape_html(&counter.text)
    )
}

fn stats(view: &WidgetView) -> String {
    format!(
        r#"<div id="stats" class="stats"><div class="stat"><span id="messageCount" class="stat-value">{}</span><span class="stat-label">Messages</span></div><div class="stat"><span id="guardrailCount" class="stat-value">{}</span><span class="stat-label">Guardrail checks</span></div></div>"#,
        view.message_count, view.guardrail_count
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Analysis panel
// ─────────────────────────────────────────────────────────────────────────────

fn analysis_row(field: &AnalysisField) -> String {
    let label = field.label();
    match field {
        AnalysisField::Summary(text) | AnalysisField::Intent(text) => format!(
            r#"<div class="mb-2"><strong>{label}:</strong> {}</div>"#,
            escape_html(text)
        ),
        AnalysisField::Category { value, severity }
        | AnalysisField::Priority { value, severity }
        | AnalysisField::Sentiment { value, severity } => format!(
            r#"<div class="mb-2"><strong>{label}:</strong> <span class="analysis-badge {}">{}</span></div>"#,
            severity.badge_class(),
            escape_html(value)
        ),
        AnalysisField::Confidence { percent, severity } => format!(
            r#"<div class="mb-2"><strong>{label}:</strong> <span class="analysis-badge {}">{percent}%</span></div>"#,
            severity.badge_class()
        ),
        AnalysisField::SuggestedResponse(text) => format!(
            r#"<div class="mt-3"><strong>{label}:</strong><br><small class="text-muted">{}</small></div>"#,
            escape_html(text)
        ),
    }
}

/// Analysis panel; hidden until an analysis has succeeded.
pub fn analysis_panel(fields: Option<&[AnalysisField]>) -> String {
    let Some(fields) = fields else {
        return r#"<div id="analysisPanel" class="analysis-panel" hidden></div>"#.to_string();
    };
    let rows: String = fields.iter().map(analysis_row).collect();
    format!(
        r#"<div id="analysisPanel" class="analysis-panel"><h3>Query analysis</h3><div id="analysisContent"><div class="mt-3">{rows}</div></div></div>"#
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Widget
// ─────────────────────────────────────────────────────────────────────────────

fn examples() -> String {
    let mut html = String::from(r#"<div class="examples">"#);
    for example in EXAMPLES {
        let vals = serde_json::json!({
            "example": example.text,
            "dangerous": example.dangerous,
        });
        let class = if example.dangerous {
            "example-btn danger"
        } else {
            "example-btn"
        };
        let _ = write!(
            html,
            r##"<button type="button" class="{class}" hx-post="/widget/example" hx-vals="{}" hx-target="#support-widget" hx-swap="outerHTML">{}</button>"##,
            escape_html(&vals.to_string()),
            escape_html(example.label)
        );
    }
    html.push_str("</div>");
    html
}

/// The whole widget; the swap target of every widget action.
pub fn widget(view: &WidgetView) -> String {
    format!(
        r##"<div id="support-widget" class="widget">
    {stats}
    {transcript}
    {banner}
    <form class="input-section" hx-post="/widget/send" hx-trigger="submit, keydown[key=='Enter'&&!shiftKey] from:#messageInput" hx-target="#support-widget" hx-swap="outerHTML" hx-indicator="#typingIndicator">
        <textarea id="messageInput" name="message" rows="3" placeholder="Ask a support question..."
            hx-on:keydown="if (event.key === 'Enter' && !event.shiftKey) event.preventDefault()"
            hx-post="/widget/input" hx-trigger="input changed delay:150ms" hx-target="#charCount" hx-swap="outerHTML">{input}</textarea>
        {counter}
        <div class="actions">
            <button id="sendBtn" type="submit" class="btn btn-primary">Send</button>
            <button id="analyzeBtn" type="button" class="btn btn-secondary" hx-post="/widget/analyze" hx-include="closest form" hx-target="#support-widget" hx-swap="outerHTML">Analyze</button>
        </div>
        {hint}
    </form>
    {examples}
    {analysis}
</div>"##,
        stats = stats(view),
        transcript = transcript(view),
        banner = banner(view.banner.as_deref()),
        input = escape_html(&view.input),
        counter = counter(&view.counter),
        hint = hint(view.hint.as_ref()),
        examples = examples(),
        analysis = analysis_panel(view.analysis.as_deref()),
    )
}

const STYLES: &str = r"
body { font-family: system-ui, sans-serif; background: #f3f4f6; margin: 0; color: #111827; }
header { background: #4f46e5; color: #fff; padding: 1rem 1.5rem; }
main { max-width: 56rem; margin: 1.5rem auto; padding: 0 1rem; }
.widget { background: #fff; border-radius: 1rem; padding: 1.25rem; box-shadow: 0 1px 3px rgba(0,0,0,.1); }
.stats { display: flex; gap: 1.5rem; margin-bottom: 1rem; }
.stat-value { font-weight: 700; margin-right: .35rem; }
.chat-container { height: 24rem; overflow-y: auto; display: flex; flex-direction: column; gap: .5rem; padding: .5rem; background: #f9fafb; border-radius: .75rem; }
.message { display: flex; gap: .5rem; align-items: flex-start; }
.message.user { justify-content: flex-end; }
.message-content { padding: .6rem .9rem; border-radius: .75rem; background: #e5e7eb; max-width: 75%; white-space: pre-wrap; }
.message.user .message-content { background: #4f46e5; color: #fff; }
.message-avatar { font-size: .75rem; color: #6b7280; }
.error-message { background: #fee2e2; color: #991b1b; padding: .5rem .75rem; border-radius: .5rem; }
.typing-indicator { display: none; gap: .25rem; padding: .5rem; }
.typing-indicator.visible, .htmx-request .typing-indicator, .typing-indicator.htmx-request { display: flex; }
.typing-indicator span { width: .5rem; height: .5rem; border-radius: 50%; background: #9ca3af; }
.input-section { margin-top: 1rem; display: flex; flex-direction: column; gap: .5rem; }
textarea { width: 100%; box-sizing: border-box; padding: .6rem; border-radius: .5rem; border: 1px solid #d1d5db; font: inherit; }
.counter { color: #6b7280; } .counter-warning { color: #f59e0b; } .counter-danger { color: #dc2626; }
.actions { display: flex; gap: .5rem; }
.btn { padding: .5rem 1rem; border-radius: .5rem; border: 0; cursor: pointer; }
.btn-primary { background: #4f46e5; color: #fff; } .btn-secondary { background: #e5e7eb; }
.alert { padding: .5rem .75rem; border-radius: .5rem; font-size: .9rem; }
.alert-warning { background: #fef3c7; } .alert-success { background: #d1fae5; }
.examples { display: flex; flex-wrap: wrap; gap: .5rem; margin-top: 1rem; }
.example-btn { border: 1px solid #a5b4fc; background: #eef2ff; border-radius: 999px; padding: .35rem .8rem; cursor: pointer; }
.example-btn.danger { border-color: #fca5a5; background: #fef2f2; }
.analysis-panel { margin-top: 1rem; padding: 1rem; border: 1px solid #e5e7eb; border-radius: .75rem; }
.analysis-badge { padding: .1rem .5rem; border-radius: 999px; font-size: .8rem; font-weight: 600; }
.badge-low { background: #d1fae5; color: #065f46; }
.badge-medium { background: #fef3c7; color: #92400e; }
.badge-high { background: #fee2e2; color: #991b1b; }
.text-muted { color: #6b7280; }
";

/// Full page around `content`.
pub fn html_shell(title: &str, content: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <meta name="description" content="Customer support chat protected by input and output guardrails">
    <title>{title} - Guardrail Support Desk</title>
    <script src="https://unpkg.com/htmx.org@2.0.8"></script>
    <style>{STYLES}</style>
</head>
<body>
    <header>
        <strong>Guardrail Support Desk</strong>
        <small>Messages up to {MAX_MESSAGE_CHARS} characters</small>
    </header>
    <main id="app">
        {content}
    </main>
</body>
</html>"#
    )
}

/// `GET /` page.
pub fn page(view: &WidgetView) -> String {
    html_shell("Support", &widget(view))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::widget::model::{CounterTone, Severity};

    fn view() -> WidgetView {
        WidgetView {
            messages: Vec::new(),
            typing: false,
            banner: None,
            hint: None,
            analysis: None,
            input: String::new(),
            counter: CharCounter::for_input(""),
            message_count: 0,
            guardrail_count: 0,
        }
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#039;Jerry&#039;&lt;/b&gt;"
        );
    }

    #[test]
    fn test_messages_are_escaped() {
        let html = message(&ChatMessage::user("<script>alert(1)</script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));

        let html = message(&ChatMessage::bot_error("Invalid input: <x>"));
        assert!(html.contains("error-message"));
        assert!(html.contains("Invalid input: &lt;x&gt;"));
    }

    #[test]
    fn test_analysis_panel_only_renders_given_rows() {
        assert!(analysis_panel(None).contains("hidden"));

        let fields = [AnalysisField::Confidence {
            percent: 40,
            severity: Severity::High,
        }];
        let html = analysis_panel(Some(&fields[..]));
        assert!(html.contains(r#"<span class="analysis-badge badge-high">40%</span>"#));
        assert!(!html.contains("Category"));
        assert!(!html.contains("Summary"));
    }

    #[test]
    fn test_banner_schedules_refresh() {
        let html = banner(Some("Please enter a message"));
        assert!(html.contains(r#"hx-trigger="load delay:5000ms""#));
        assert_eq!(banner(None), r#"<div id="errorContainer"></div>"#);
    }

    #[test]
    fn test_widget_renders_state() {
        let mut v = view();
        v.messages.push(ChatMessage::user("Hi & bye"));
        v.message_count = 1;
        v.guardrail_count = 1;
        v.counter = CharCounter {
            text: "-2 characters remaining".into(),
            tone: CounterTone::Danger,
        };

        let html = widget(&v);
        assert!(html.contains(r#"id="support-widget""#));
        assert!(html.contains("Hi &amp; bye"));
        assert!(html.contains(r#"<span id="messageCount" class="stat-value">1</span>"#));
        assert!(html.contains("counter counter-danger"));
        assert!(html.contains("example-btn danger"));

        let page = page(&v);
        assert!(page.starts_with("<!DOCTYPE html>"));
        assert!(page.contains("htmx.org"));
    }

    #[test]
    fn test_enter_sends_and_shift_enter_does_not() {
        let html = widget(&view());
        assert!(html.contains(
            r#"hx-trigger="submit, keydown[key=='Enter'&&!shiftKey] from:#messageInput""#
        ));
        assert!(html.contains(
            r#"hx-on:keydown="if (event.key === 'Enter' && !event.shiftKey) event.preventDefault()""#
        ));
    }
}
