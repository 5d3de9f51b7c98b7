//! Guardrail Support Desk server and terminal client.
//!
//! `serve` (the default) runs the support API and the web widget;
//! `chat` opens a terminal session against a running server.

use mimalloc::MiMalloc;

/// Global allocator for improved performance (M-MIMALLOC-APPS).
#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use guardrail_support_desk::{
    cli,
    config::{AppConfig, Cli, Command, load_llm_settings},
    llm::{ChatCompletionsDriver, ChatModel},
    server,
};

/// Structured logs (M-LOG-STRUCTURED); `RUST_LOG` overrides the `info` default.
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json().with_target(true)).init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env (if present) before clap reads env-backed flags
    let _ = dotenv();

    let cli = Cli::parse();
    let config = AppConfig::from_cli(&cli).context("Failed to load configuration")?;
    init_tracing(config.logging.json);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let settings =
                load_llm_settings(&config.model).context("Failed to load LLM settings")?;

            info!(
                name: "llm.config.loaded",
                base_url = %settings.base_url,
                model = %settings.model,
                "LLM configuration loaded"
            );

            let model: Arc<dyn ChatModel> = Arc::new(ChatCompletionsDriver::new(settings)?);
            server::start_server(Arc::new(config), model).await
        }
        Command::Chat { server_url } => {
            info!(name: "cli.started", server_url = %server_url, "Terminal chat started");
            cli::run_stdio(&server_url).await?;
            Ok(())
        }
    }
}
