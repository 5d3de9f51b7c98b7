use crate::llm::{LlmSettings, Provider, provider::DEFAULT_AZURE_API_VERSION};
use clap::{Parser, Subcommand};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file path
    #[arg(short, long, env = "CONFIG_FILE", global = true)]
    pub config: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PORT", global = true)]
    pub port: Option<u16>,

    /// Enable rate limiting
    #[arg(long, env = "RATE_LIMIT_ENABLED", global = true)]
    pub rate_limit_enabled: Option<bool>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    pub log_json: Option<bool>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the support API and the web widget (default)
    Serve,
    /// Chat with a running server from the terminal
    Chat {
        /// Base URL of the support server
        #[arg(long, env = "SUPPORT_SERVER_URL", default_value = "http://127.0.0.1:8080")]
        server_url: String,
    },
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub guardrails: GuardrailConfig,
    pub resilience: ResilienceConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GuardrailConfig {
    /// Longest message the content safety guardrail accepts.
    pub max_input_length: usize,
    /// Extra model calls allowed after an output guardrail asks for a reprompt.
    pub output_max_retries: u32,
    /// Demand a name or ticket number before answering.
    pub require_customer_context: bool,
    /// Messages kept in conversation memory.
    pub memory_window: usize,
}

impl Default for GuardrailConfig {
    fn default() -> Self {
        Self {
            max_input_length: 1000,
            output_max_retries: 2,
            require_customer_context: false,
            memory_window: crate::assistant::memory::DEFAULT_WINDOW,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ResilienceConfig {
    pub rate_limit_enabled: bool,
    pub timeout_disabled: bool,
    pub request_timeout_secs: u64,
    pub requests_per_second: u32,
    pub burst_size: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ModelConfig {
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub json: bool,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_args(std::env::args())
    }

    pub fn load_from_args<I, T>(args: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let cli = Cli::try_parse_from(args).map_err(|e| ConfigError::Message(e.to_string()))?;
        Self::from_cli(&cli)
    }

    /// Layer defaults, config file, `SUPPORT_*` env vars and CLI flags.
    ///
    /// Priority: CLI flag (or its env var) > `SUPPORT_*` env > file > defaults.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let defaults = GuardrailConfig::default();
        let mut builder = Config::builder()
            .set_default("server.port", 8080)?
            .set_default("server.host", "127.0.0.1")?
            .set_default("guardrails.max_input_length", defaults.max_input_length as u64)?
            .set_default("guardrails.output_max_retries", defaults.output_max_retries)?
            .set_default("guardrails.require_customer_context", defaults.require_customer_context)?
            .set_default("guardrails.memory_window", defaults.memory_window as u64)?
            .set_default("resilience.rate_limit_enabled", true)?
            .set_default("resilience.timeout_disabled", false)?
            .set_default("resilience.request_timeout_secs", 60)?
            .set_default("resilience.requests_per_second", 5)?
            .set_default("resilience.burst_size", 10)?
            .set_default("model.temperature", 0.3)?
            .set_default("model.max_tokens", 1000)?
            .set_default("model.timeout_secs", 60)?
            .set_default("logging.json", false)?;

        // Explicit file must exist; ./config.{yaml,toml,json} is optional.
        builder = match &cli.config {
            Some(path) => builder.add_source(File::with_name(path)),
            None => builder.add_source(File::with_name("config").required(false)),
        };

        // E.g. SUPPORT_SERVER__PORT=9000
        builder = builder.add_source(
            Environment::with_prefix("SUPPORT")
                .separator("__")
                .try_parsing(true),
        );

        if let Some(port) = cli.port {
            builder = builder.set_override("server.port", port)?;
        }
        if let Some(rl) = cli.rate_limit_enabled {
            builder = builder.set_override("resilience.rate_limit_enabled", rl)?;
        }
        if let Some(json) = cli.log_json {
            builder = builder.set_override("logging.json", json)?;
        }

        builder.build()?.try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        if self.resilience.timeout_disabled {
            // A year is as good as no timeout and keeps the layer stack uniform.
            Duration::from_secs(365 * 24 * 60 * 60)
        } else {
            Duration::from_secs(self.resilience.request_timeout_secs)
        }
    }

    /// Deadline for widget submits: never shorter than a chat that uses every
    /// output retry at the full model timeout.
    pub fn widget_timeout(&self) -> Duration {
        let attempts = 1 + u64::from(self.guardrails.output_max_retries);
        let model_budget = Duration::from_secs(self.model.timeout_secs.saturating_mul(attempts));
        self.request_timeout().max(model_budget)
    }
}

fn required_env(key: &'static str) -> Result<String, ConfigError> {
    let value = env::var(key).map_err(|_| ConfigError::NotFound(key.to_string()))?;
    if value.trim().is_empty() {
        return Err(ConfigError::Message(format!("{key} cannot be empty")));
    }
    Ok(value)
}

/// LLM endpoint settings from `LLM_*` / `AZURE_*` env vars plus model tuning.
pub fn load_llm_settings(model: &ModelConfig) -> Result<LlmSettings, ConfigError> {
    let base_url = required_env("LLM_BASE_URL")?;
    let model_name = required_env("LLM_MODEL")?;

    let api_key = env::var("LLM_API_KEY")
        .ok()
        .filter(|s| !s.trim().is_empty());

    // Auto-detect provider from base URL
    let mut provider = Provider::detect_from_url(&base_url);

    if let Provider::AzureOpenAI { .. } = &provider {
        let deployment_name = env::var("AZURE_DEPLOYMENT_NAME")
            .map_err(|_| ConfigError::NotFound("AZURE_DEPLOYMENT_NAME".to_string()))?;
        provider = Provider::AzureOpenAI {
            deployment_name,
            api_version: env::var("AZURE_API_VERSION")
                .unwrap_or_else(|_| DEFAULT_AZURE_API_VERSION.to_string()),
        };
    }

    Ok(LlmSettings {
        base_url,
        api_key,
        model: model_name,
        provider,
        temperature: model.temperature,
        max_tokens: model.max_tokens,
        timeout: Duration::from_secs(model.timeout_secs),
    })
}
