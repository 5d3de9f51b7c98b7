//! Support endpoint semantics, shared by the HTTP handlers and the in-process
//! widget transport.

use axum::http::StatusCode;

use crate::assistant::{AssistantError, SupportAssistant};
use crate::guardrail::GuardrailError;
use crate::types::{AnalysisResult, ChatResponse};

pub const OUTPUT_FAILURE_MESSAGE: &str = "Unable to generate appropriate response";
pub const MODEL_FAILURE_MESSAGE: &str =
    "The assistant is temporarily unavailable. Please try again later.";

/// Status and body for a chat message.
pub async fn chat_reply(assistant: &SupportAssistant, message: &str) -> (StatusCode, ChatResponse) {
    match assistant.chat(message).await {
        Ok(reply) => (StatusCode::OK, ChatResponse::ok(reply)),
        Err(AssistantError::Guardrail(err @ GuardrailError::Input { .. })) => (
            StatusCode::BAD_REQUEST,
            ChatResponse::failed(format!("Invalid input: {err}")),
        ),
        Err(AssistantError::Guardrail(GuardrailError::Output { .. })) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ChatResponse::failed(OUTPUT_FAILURE_MESSAGE),
        ),
        Err(AssistantError::Model(err)) => {
            tracing::error!(
                name: "support.chat.model_failed",
                error = %err,
                "Model call failed"
            );
            (StatusCode::BAD_GATEWAY, ChatResponse::failed(MODEL_FAILURE_MESSAGE))
        }
    }
}

/// Analysis of a query; any failure maps to 400.
pub async fn analyze_reply(
    assistant: &SupportAssistant,
    message: &str,
) -> Result<AnalysisResult, StatusCode> {
    assistant.analyze_query(message).await.map_err(|err| {
        tracing::warn!(
            name: "support.analyze.failed",
            error = %err,
            "Query analysis failed"
        );
        StatusCode::BAD_REQUEST
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tests::ScriptedModel;
    use crate::config::GuardrailConfig;
    use std::sync::Arc;

    fn assistant(model: ScriptedModel) -> SupportAssistant {
        SupportAssistant::new(Arc::new(model), &GuardrailConfig::default())
    }

    #[tokio::test]
    async fn test_input_failure_is_bad_request() {
        let support = assistant(ScriptedModel::default());
        let (status, body) = chat_reply(&support, "hi").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            body.error.as_deref(),
            Some("Invalid input: Your message is too short. Please provide more details.")
        );
    }

    #[tokio::test]
    async fn test_output_failure_is_server_error() {
        let support = assistant(ScriptedModel::new(["Nope.", "Nope.", "Nope."]));
        let (status, body) = chat_reply(&support, "Can you help with my plan?").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error.as_deref(), Some(OUTPUT_FAILURE_MESSAGE));
        assert!(!body.success);
    }

    #[tokio::test]
    async fn test_model_failure_is_bad_gateway() {
        let support = assistant(ScriptedModel::failing());
        let (status, _) = chat_reply(&support, "Can you help with my plan?").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_analyze_failure_is_bad_request() {
        let support = assistant(ScriptedModel::new(["no json here"; 3]));
        let status = analyze_reply(&support, "My invoice looks wrong")
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
