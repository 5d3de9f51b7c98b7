use guardrail_support_desk::config::{AppConfig, ModelConfig, load_llm_settings};
use guardrail_support_desk::llm::Provider;
use serial_test::serial;
use std::env;
use std::fs;

// Helper to clear environment variables that might interfere with tests
fn clear_env_vars() {
    unsafe {
        for key in [
            "SUPPORT_SERVER__PORT",
            "SUPPORT_GUARDRAILS__OUTPUT_MAX_RETRIES",
            "SUPPORT_RESILIENCE__RATE_LIMIT_ENABLED",
            "CONFIG_FILE",
            "PORT",
            "RATE_LIMIT_ENABLED",
            "LOG_JSON",
            "LLM_BASE_URL",
            "LLM_MODEL",
            "LLM_API_KEY",
            "AZURE_DEPLOYMENT_NAME",
            "AZURE_API_VERSION",
        ] {
            env::remove_var(key);
        }
    }
}

fn model_config() -> ModelConfig {
    ModelConfig {
        temperature: 0.3,
        max_tokens: 1000,
        timeout_secs: 60,
    }
}

#[test]
#[serial]
fn test_default_config() {
    clear_env_vars();

    let config = AppConfig::load_from_args(["guardrail-support-desk"]).unwrap();
    assert_eq!(config.server.port, 8080);
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.guardrails.max_input_length, 1000);
    assert_eq!(config.guardrails.output_max_retries, 2);
    assert!(!config.guardrails.require_customer_context);
    assert!(config.resilience.rate_limit_enabled);
    assert!(!config.logging.json);
    // Widget submits outlast a chat that spends every output retry.
    assert_eq!(config.request_timeout(), std::time::Duration::from_secs(60));
    assert_eq!(config.widget_timeout(), std::time::Duration::from_secs(180));
}

#[test]
#[serial]
fn test_env_override() {
    clear_env_vars();
    unsafe {
        env::set_var("SUPPORT_SERVER__PORT", "9090");
        env::set_var("SUPPORT_GUARDRAILS__OUTPUT_MAX_RETRIES", "4");
    }

    let config = AppConfig::load_from_args(["guardrail-support-desk"]).expect("Failed to load config");
    assert_eq!(config.server.port, 9090);
    assert_eq!(config.guardrails.output_max_retries, 4);

    clear_env_vars();
}

#[test]
#[serial]
fn test_file_load() {
    clear_env_vars();

    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("support.yaml");
    fs::write(
        &file_path,
        r"
server:
  port: 7070
guardrails:
  require_customer_context: true
",
    )
    .expect("Failed to write temp config");

    let config = AppConfig::load_from_args([
        "guardrail-support-desk",
        "--config",
        file_path.to_str().unwrap(),
    ])
    .unwrap();

    assert_eq!(config.server.port, 7070);
    assert!(config.guardrails.require_customer_context);
    // Untouched keys keep their defaults.
    assert_eq!(config.guardrails.memory_window, 10);
}

#[test]
#[serial]
fn test_missing_config_file_is_an_error() {
    clear_env_vars();
    let result = AppConfig::load_from_args([
        "guardrail-support-desk",
        "--config",
        "/definitely/not/here.yaml",
    ]);
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env_vars();
    unsafe {
        env::set_var("SUPPORT_SERVER__PORT", "9090");
        env::set_var("SUPPORT_RESILIENCE__RATE_LIMIT_ENABLED", "true");
    }

    let config = AppConfig::load_from_args([
        "guardrail-support-desk",
        "--port",
        "6060",
        "--rate-limit-enabled",
        "false",
        "serve",
    ])
    .unwrap();
    assert_eq!(config.server.port, 6060);
    assert!(!config.resilience.rate_limit_enabled);

    clear_env_vars();
}

#[test]
#[serial]
fn test_llm_settings_require_base_url() {
    clear_env_vars();
    assert!(load_llm_settings(&model_config()).is_err());
}

#[test]
#[serial]
fn test_llm_settings_detect_azure() {
    clear_env_vars();
    unsafe {
        env::set_var("LLM_BASE_URL", "https://contoso.openai.azure.com");
        env::set_var("LLM_MODEL", "gpt-4o-mini");
        env::set_var("LLM_API_KEY", "  ");
        env::set_var("AZURE_DEPLOYMENT_NAME", "support");
    }

    let settings = load_llm_settings(&model_config()).unwrap();
    assert!(settings.api_key.is_none());
    match settings.provider {
        Provider::AzureOpenAI {
            deployment_name, ..
        } => assert_eq!(deployment_name, "support"),
        other => panic!("expected Azure provider, got {other:?}"),
    }

    clear_env_vars();
}
