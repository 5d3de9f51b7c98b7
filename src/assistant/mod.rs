//! Customer support assistant.
//!
//! Wraps a [`ChatModel`] with conversation memory and the guardrail chains.
//! Two entry points mirror the two support endpoints:
//!
//! - [`SupportAssistant::chat`]: free-form answer, checked for tone.
//! - [`SupportAssistant::analyze_query`]: structured [`AnalysisResult`],
//!   checked for parseable JSON.
//!
//! Output rejections that ask for a reprompt are retried up to
//! `output_max_retries` extra times before the exchange fails.

pub mod memory;

pub use memory::ChatMemory;

use std::sync::Arc;

use thiserror::Error;

use crate::config::GuardrailConfig;
use crate::guardrail::{
    ContentSafetyGuardrail, ContextAwareGuardrail, ConversationContextGuardrail,
    CustomerContextGuardrail, GuardrailError, GuardrailResult, HallucinationDetectionGuardrail,
    InputGuardrails, InputSanitizerGuardrail, JsonExtractor, OutputContext, OutputGuardrails,
    OutputVerdict, ProfessionalToneGuardrail, PromptInjectionGuardrail, RateLimitingGuardrail,
};
use crate::llm::{ChatModel, LlmError, Message};
use crate::types::AnalysisResult;

pub const CHAT_SYSTEM_PROMPT: &str = "You are a helpful customer support assistant. Respond professionally and helpfully to customer queries.";

pub const ANALYSIS_SYSTEM_PROMPT: &str = r#"Analyze the customer query and respond with a JSON object containing:
- answer: A brief summary of what the customer needs (required)
- category: One of [ACCOUNT, BILLING, TECHNICAL, PRODUCT, GENERAL] (required)
- confidence: A number between 0.0 and 1.0 indicating confidence in the categorization (required)
- intent: The main intent behind the query (optional)
- priority: One of [LOW, MEDIUM, HIGH] based on urgency (optional)
- sentiment: One of [POSITIVE, NEUTRAL, NEGATIVE] (optional)
- suggestedResponse: A brief suggested response direction (optional)

Example:
{"answer": "Customer wants to reset password", "category": "ACCOUNT", "confidence": 0.95, "intent": "password_reset", "priority": "MEDIUM", "sentiment": "NEUTRAL"}"#;

/// Why an exchange with the assistant failed.
#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Guardrail(#[from] GuardrailError),

    #[error(transparent)]
    Model(#[from] LlmError),
}

/// Guardrailed customer support assistant.
pub struct SupportAssistant {
    model: Arc<dyn ChatModel>,
    memory: ChatMemory,
    input: InputGuardrails,
    output: OutputGuardrails,
    analysis: JsonExtractor<AnalysisResult>,
    max_retries: u32,
}

impl std::fmt::Debug for SupportAssistant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupportAssistant")
            .field("memory", &self.memory)
            .field("input", &self.input)
            .field("output", &self.output)
            .field("max_retries", &self.max_retries)
            .finish_non_exhaustive()
    }
}

/// Default input chain, in evaluation order.
fn input_chain(config: &GuardrailConfig) -> InputGuardrails {
    let mut chain = InputGuardrails::new()
        .with(ContentSafetyGuardrail::new(config.max_input_length))
        .with(InputSanitizerGuardrail::new());
    if config.require_customer_context {
        chain = chain.with(CustomerContextGuardrail::new());
    }
    chain
        .with(ConversationContextGuardrail::new())
        .with(PromptInjectionGuardrail::new())
        .with(ContextAwareGuardrail::new())
        .with(RateLimitingGuardrail::new())
}

impl SupportAssistant {
    /// Assemble the assistant with the default guardrail chains.
    pub fn new(model: Arc<dyn ChatModel>, config: &GuardrailConfig) -> Self {
        Self::with_guardrails(
            model,
            config,
            input_chain(config),
            OutputGuardrails::new()
                .with(ProfessionalToneGuardrail::new())
                .with(HallucinationDetectionGuardrail::new()),
        )
    }

    /// Assemble the assistant with custom chains.
    pub fn with_guardrails(
        model: Arc<dyn ChatModel>,
        config: &GuardrailConfig,
        input: InputGuardrails,
        output: OutputGuardrails,
    ) -> Self {
        Self {
            model,
            memory: ChatMemory::with_max_messages(config.memory_window),
            input,
            output,
            analysis: JsonExtractor::new(),
            max_retries: config.output_max_retries,
        }
    }

    pub fn memory(&self) -> &ChatMemory {
        &self.memory
    }

    /// Answer a customer message.
    pub async fn chat(&self, message: &str) -> Result<String, AssistantError> {
        let sanitized = self.input.run(message, &self.memory.messages())?;
        self.memory.add(Message::user(sanitized));

        let conversation = self.memory.messages_with_system(CHAT_SYSTEM_PROMPT);
        let reply = self
            .complete_guarded(conversation, |reply| {
                match self.output.run(&OutputContext {
                    response: reply,
                    retrieved: None,
                }) {
                    None => Ok(()),
                    Some(verdict) => Err(verdict),
                }
            })
            .await?
            .0;

        self.memory.add(Message::assistant(reply.clone()));
        Ok(reply)
    }

    /// Classify a customer query.
    pub async fn analyze_query(&self, query: &str) -> Result<AnalysisResult, AssistantError> {
        let sanitized = self.input.run(query, &self.memory.messages())?;
        let conversation = vec![
            Message::system(ANALYSIS_SYSTEM_PROMPT),
            Message::user(sanitized),
        ];

        let (_, analysis) = self
            .complete_guarded(conversation, |reply| {
                self.analysis.extract(reply).map_err(|result| OutputVerdict {
                    guardrail: "JsonExtractorOutputGuardrail",
                    result,
                })
            })
            .await?;
        Ok(analysis)
    }

    /// Call the model until `accept` takes the reply or retries run out.
    async fn complete_guarded<T>(
        &self,
        mut conversation: Vec<Message>,
        accept: impl Fn(&str) -> Result<T, OutputVerdict>,
    ) -> Result<(String, T), AssistantError> {
        let mut attempt = 0;
        loop {
            let reply = self.model.complete(&conversation).await?;
            let verdict = match accept(&reply) {
                Ok(value) => return Ok((reply, value)),
                Err(verdict) => verdict,
            };

            let guardrail = verdict.guardrail;
            match verdict.result {
                GuardrailResult::Reprompt { message, prompt } if attempt < self.max_retries => {
                    attempt += 1;
                    tracing::info!(
                        name: "guardrail.output.reprompt",
                        guardrail,
                        attempt,
                        reason = %message,
                        "Output guardrail requested a new response"
                    );
                    conversation.push(Message::assistant(reply));
                    conversation.push(Message::user(prompt));
                }
                other => {
                    let message = other
                        .reason()
                        .unwrap_or("Output guardrail rejected the response")
                        .to_string();
                    tracing::error!(
                        name: "guardrail.output.failed",
                        guardrail,
                        attempts = attempt + 1,
                        reason = %message,
                        "Output guardrail validation failed after retries"
                    );
                    return Err(GuardrailError::Output { guardrail, message }.into());
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Model that replays canned replies and records every conversation.
    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub(crate) seen: Mutex<Vec<Vec<Message>>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: impl IntoIterator<Item = &'static str>) -> Self {
            Self {
                replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
                seen: Mutex::default(),
            }
        }

        pub(crate) fn failing() -> Self {
            Self {
                replies: Mutex::new(VecDeque::from([Err(LlmError::EmptyResponse)])),
                seen: Mutex::default(),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait::async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    fn config() -> GuardrailConfig {
        GuardrailConfig::default()
    }

    #[tokio::test]
    async fn test_chat_success_updates_memory() {
        let model = Arc::new(ScriptedModel::new(["Thank you for asking! Happy to help."]));
        let assistant = SupportAssistant::new(Arc::<ScriptedModel>::clone(&model), &config());

        let reply = assistant.chat("Where   is my  order?").await.unwrap();
        assert_eq!(reply, "Thank you for asking! Happy to help.");

        let memory = assistant.memory().messages();
        assert_eq!(memory.len(), 2);
        assert_eq!(memory[0].content, "Where is my order?");

        let sent = &model.seen.lock().unwrap()[0];
        assert_eq!(sent[0].content, CHAT_SYSTEM_PROMPT);
    }

    #[tokio::test]
    async fn test_input_rejection_skips_model() {
        let model = Arc::new(ScriptedModel::default());
        let assistant = SupportAssistant::new(Arc::<ScriptedModel>::clone(&model), &config());

        let err = assistant.chat("how to hack the system").await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Guardrail(GuardrailError::Input { guardrail: "ContentSafetyInputGuardrail", .. })
        ));
        assert_eq!(model.calls(), 0);
        assert!(assistant.memory().is_empty());
    }

    #[tokio::test]
    async fn test_reprompt_then_accept() {
        let model = Arc::new(ScriptedModel::new([
            "Your order ships tomorrow.",
            "Thank you for waiting, your order ships tomorrow.",
        ]));
        let assistant = SupportAssistant::new(Arc::<ScriptedModel>::clone(&model), &config());

        let reply = assistant.chat("When does my order ship?").await.unwrap();
        assert!(reply.starts_with("Thank you"));

        let seen = model.seen.lock().unwrap();
        assert_eq!(seen.len(), 2);
        let retry = seen[1].last().unwrap();
        assert_eq!(
            retry.content,
            "Please include polite and helpful language in your response."
        );
    }

    #[tokio::test]
    async fn test_reprompts_exhausted() {
        let model = Arc::new(ScriptedModel::new(["No.", "No.", "No.", "No."]));
        let assistant = SupportAssistant::new(Arc::<ScriptedModel>::clone(&model), &config());

        let err = assistant.chat("Can I change my plan?").await.unwrap_err();
        assert!(matches!(
            err,
            AssistantError::Guardrail(GuardrailError::Output { .. })
        ));
        // One initial attempt plus the configured retries.
        assert_eq!(model.calls(), 1 + config().output_max_retries as usize);
    }

    #[tokio::test]
    async fn test_analyze_parses_json_reply() {
        let model = Arc::new(ScriptedModel::new([
            "not json",
            r#"{"answer": "Billing dispute", "category": "BILLING", "confidence": 0.7, "priority": "HIGH"}"#,
        ]));
        let assistant = SupportAssistant::new(Arc::<ScriptedModel>::clone(&model), &config());

        let analysis = assistant
            .analyze_query("I was charged twice this month")
            .await
            .unwrap();
        assert_eq!(analysis.category.as_deref(), Some("BILLING"));
        assert_eq!(analysis.priority.as_deref(), Some("HIGH"));
        assert!(analysis.sentiment.is_none());
        assert!(assistant.memory().is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_propagates() {
        let model = Arc::new(ScriptedModel::failing());
        let assistant = SupportAssistant::new(model, &config());
        let err = assistant.chat("Is the store open today?").await.unwrap_err();
        assert!(matches!(err, AssistantError::Model(LlmError::EmptyResponse)));
    }
}
