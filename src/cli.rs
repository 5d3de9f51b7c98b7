//! Terminal front-end for the chat widget.
//!
//! Each line is a chat message; `/analyze <text>` asks for a query analysis
//! and `/quit` exits.

use thiserror::Error;
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

use crate::widget::{
    AnalysisField, ChatMessage, ChatWidgetController, HttpSupportApi, Role, SubmitOutcome,
    SupportApi, TransportError, WidgetView,
};

#[derive(Debug, Error)]
pub enum CliError {
    #[error("stdin/stdout I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command<'a> {
    Chat(&'a str),
    Analyze(&'a str),
    Quit,
}

fn parse(line: &str) -> Command<'_> {
    let trimmed = line.trim();
    if trimmed == "/quit" {
        Command::Quit
    } else if let Some(rest) = trimmed
        .strip_prefix("/analyze")
        .filter(|rest| rest.is_empty() || rest.starts_with(char::is_whitespace))
    {
        Command::Analyze(rest)
    } else {
        Command::Chat(line)
    }
}

fn message_line(msg: &ChatMessage) -> String {
    match (msg.role, msg.is_error) {
        (Role::User, _) => format!("you> {}", msg.text),
        (Role::Bot, false) => format!("bot> {}", msg.text),
        (Role::Bot, true) => format!("bot! {}", msg.text),
    }
}

fn field_line(field: &AnalysisField) -> String {
    let label = field.label();
    match field {
        AnalysisField::Summary(text)
        | AnalysisField::Intent(text)
        | AnalysisField::SuggestedResponse(text) => format!("  {label}: {text}"),
        AnalysisField::Category { value, severity }
        | AnalysisField::Priority { value, severity }
        | AnalysisField::Sentiment { value, severity } => {
            format!("  {label}: {value} [{}]", severity.badge_class())
        }
        AnalysisField::Confidence { percent, severity } => {
            format!("  {label}: {percent}% [{}]", severity.badge_class())
        }
    }
}

/// Lines to print after a submit: new bubbles, then the banner or panel.
fn report(outcome: &SubmitOutcome, before: usize, view: &WidgetView, analysis: bool) -> Vec<String> {
    let mut lines: Vec<String> = view
        .messages
        .iter()
        .skip(before)
        // The user's own line is already on screen.
        .filter(|m| m.role == Role::Bot)
        .map(message_line)
        .collect();

    match outcome {
        SubmitOutcome::Delivered if analysis => {
            lines.push("analysis:".to_string());
            if let Some(fields) = &view.analysis {
                lines.extend(fields.iter().map(field_line));
            }
        }
        SubmitOutcome::Delivered => {}
        SubmitOutcome::Rejected(_)
        | SubmitOutcome::ApplicationError(_)
        | SubmitOutcome::TransportError => {
            if let Some(banner) = &view.banner {
                lines.push(format!("error: {banner}"));
            }
        }
    }

    lines.push(format!(
        "[messages: {} | guardrail checks: {}]",
        view.message_count, view.guardrail_count
    ));
    lines
}

/// Drive `controller` from `input` until EOF or `/quit`.
pub async fn run<A, R, W>(
    controller: &ChatWidgetController<A>,
    input: R,
    output: &mut W,
) -> Result<(), CliError>
where
    A: SupportApi,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all(b"Type a message, /analyze <text> to analyze, /quit to exit.\n")
        .await?;
    output.flush().await?;

    while let Some(line) = lines.next_line().await? {
        let before = controller.view().messages.len();
        let (outcome, analysis) = match parse(&line) {
            Command::Quit => break,
            Command::Analyze(text) => (controller.submit_analysis_request(text).await, true),
            Command::Chat(text) => (controller.submit_chat_message(text).await, false),
        };
        debug!(name: "cli.submit", outcome = ?outcome, "Submitted from terminal");

        for line in report(&outcome, before, &controller.view(), analysis) {
            output.write_all(line.as_bytes()).await?;
            output.write_all(b"\n").await?;
        }
        output.flush().await?;
    }
    Ok(())
}

/// REPL against a running server at `server_url`.
pub async fn run_stdio(server_url: &str) -> Result<(), CliError> {
    let controller = ChatWidgetController::new(HttpSupportApi::new(server_url)?);
    let mut stdout = io::stdout();
    run(&controller, BufReader::new(io::stdin()), &mut stdout).await
}
