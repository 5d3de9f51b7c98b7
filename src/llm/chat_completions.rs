//! `OpenAI` Chat Completions API driver.
//!
//! Sends a non-streaming request to `/v1/chat/completions` (or the Azure
//! deployment URL) and returns the first choice's message text.

use serde::{Deserialize, Serialize};

use super::{ChatModel, LlmError, LlmSettings, Message};

/// Driver for the `OpenAI` Chat Completions API.
#[derive(Clone)]
pub struct ChatCompletionsDriver {
    http: reqwest::Client,
    settings: LlmSettings,
}

impl std::fmt::Debug for ChatCompletionsDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatCompletionsDriver")
            .field("base_url", &self.settings.base_url)
            .field("model", &self.settings.model)
            .field("provider", &self.settings.provider)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsDriver {
    /// Create a new driver with the given settings.
    pub fn new(settings: LlmSettings) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    fn url(&self) -> String {
        self.settings
            .provider
            .build_chat_url(&self.settings.base_url)
    }
}

/// Pull the assistant text out of a decoded completion.
fn first_choice_text(resp: CompletionResponse) -> Result<String, LlmError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|s| !s.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

#[async_trait::async_trait]
impl ChatModel for ChatCompletionsDriver {
    async fn complete(&self, messages: &[Message]) -> Result<String, LlmError> {
        let body = CompletionRequest {
            model: &self.settings.model,
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
        };

        let mut rb = self.http.post(self.url()).json(&body);
        if let Some(k) = &self.settings.api_key {
            rb = if self.settings.provider.uses_api_key_header() {
                rb.header("api-key", k)
            } else {
                rb.bearer_auth(k)
            };
        }

        tracing::debug!(
            name: "llm.request",
            model = %self.settings.model,
            message_count = messages.len(),
            "Sending chat completion request"
        );

        let resp = rb.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(
                name: "llm.response.error",
                status = status.as_u16(),
                "Chat completion request failed"
            );
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: CompletionResponse = resp.json().await?;
        let text = first_choice_text(decoded)?;

        tracing::debug!(
            name: "llm.response",
            content_length = text.len(),
            "Chat completion received"
        );

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_choice_text() {
        let resp: CompletionResponse = serde_json::from_str(
            r#"{"choices":[{"index":0,"message":{"role":"assistant","content":"Happy to help!"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_choice_text(resp).unwrap(), "Happy to help!");
    }

    #[test]
    fn test_missing_content_is_empty_response() {
        let resp: CompletionResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(matches!(
            first_choice_text(resp),
            Err(LlmError::EmptyResponse)
        ));

        let resp: CompletionResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(
            first_choice_text(resp),
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_request_serializes_lowercase_roles() {
        let messages = [Message::system("sys"), Message::user("hi")];
        let body = CompletionRequest {
            model: "gpt-4o-mini",
            messages: &messages,
            temperature: 0.3,
            max_tokens: 512,
        };
        let v = serde_json::to_value(&body).unwrap();
        assert_eq!(v["messages"][0]["role"], "system");
        assert_eq!(v["messages"][1]["role"], "user");
        assert_eq!(v["max_tokens"], 512);
    }
}
