//! How the widget reaches the support endpoints.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::assistant::SupportAssistant;
use crate::support;
use crate::types::{AnalysisResult, ChatRequest, ChatResponse};

pub const CHAT_PATH: &str = "/api/support/chat";
pub const ANALYZE_PATH: &str = "/api/support/analyze";

/// The request never produced a usable response.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("invalid server URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result of an analysis request that reached the server.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    Analysis(AnalysisResult),
    /// Non-2xx status.
    Rejected(u16),
}

/// The two support endpoints as seen by the widget.
#[async_trait]
pub trait SupportApi: Send + Sync {
    /// `POST /api/support/chat`. The body is returned whatever the status.
    async fn chat(&self, message: &str) -> Result<ChatResponse, TransportError>;

    /// `POST /api/support/analyze`.
    async fn analyze(&self, message: &str) -> Result<AnalyzeOutcome, TransportError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP
// ─────────────────────────────────────────────────────────────────────────────

/// Support API over HTTP.
#[derive(Debug, Clone)]
pub struct HttpSupportApi {
    base_url: Url,
    http: reqwest::Client,
}

impl HttpSupportApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl AsRef<str>) -> Result<Self, TransportError> {
        Self::with_client(base_url, reqwest::Client::new())
    }

    pub fn with_client(
        base_url: impl AsRef<str>,
        http: reqwest::Client,
    ) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self { base_url, http })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Url {
        self.base_url
            .join(path)
            .unwrap_or_else(|_| self.base_url.clone())
    }

    async fn post(&self, path: &str, message: &str) -> Result<reqwest::Response, TransportError> {
        let req = ChatRequest {
            message: message.to_string(),
        };
        Ok(self.http.post(self.url(path)).json(&req).send().await?)
    }
}

#[async_trait]
impl SupportApi for HttpSupportApi {
    async fn chat(&self, message: &str) -> Result<ChatResponse, TransportError> {
        let response = self.post(CHAT_PATH, message).await?;
        tracing::debug!(
            name: "widget.http.chat",
            status = response.status().as_u16(),
            "Chat response received"
        );
        // Failures carry a ChatResponse body too, so the status is not checked.
        Ok(response.json().await?)
    }

    async fn analyze(&self, message: &str) -> Result<AnalyzeOutcome, TransportError> {
        let response = self.post(ANALYZE_PATH, message).await?;
        let status = response.status();
        tracing::debug!(
            name: "widget.http.analyze",
            status = status.as_u16(),
            "Analysis response received"
        );
        if status.is_success() {
            Ok(AnalyzeOutcome::Analysis(response.json().await?))
        } else {
            Ok(AnalyzeOutcome::Rejected(status.as_u16()))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// In-process
// ─────────────────────────────────────────────────────────────────────────────

/// Support API served by an assistant in the same process.
#[derive(Debug, Clone)]
pub struct LocalSupportApi {
    assistant: Arc<SupportAssistant>,
}

impl LocalSupportApi {
    pub fn new(assistant: Arc<SupportAssistant>) -> Self {
        Self { assistant }
    }
}

#[async_trait]
impl SupportApi for LocalSupportApi {
    async fn chat(&self, message: &str) -> Result<ChatResponse, TransportError> {
        let (_, body) = support::chat_reply(&self.assistant, message).await;
        Ok(body)
    }

    async fn analyze(&self, message: &str) -> Result<AnalyzeOutcome, TransportError> {
        Ok(match support::analyze_reply(&self.assistant, message).await {
            Ok(analysis) => AnalyzeOutcome::Analysis(analysis),
            Err(status) => AnalyzeOutcome::Rejected(status.as_u16()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::tests::ScriptedModel;
    use crate::config::GuardrailConfig;

    #[test]
    fn test_url_join_ignores_base_path() {
        let api = HttpSupportApi::new("http://localhost:8080/ui/").unwrap();
        assert_eq!(
            api.url(CHAT_PATH).as_str(),
            "http://localhost:8080/api/support/chat"
        );
    }

    #[test]
    fn test_rejects_bad_base_url() {
        assert!(matches!(
            HttpSupportApi::new("not a url"),
            Err(TransportError::Url(_))
        ));
    }

    #[tokio::test]
    async fn test_local_api_maps_failures() {
        let assistant = SupportAssistant::new(
            Arc::new(ScriptedModel::default()),
            &GuardrailConfig::default(),
        );
        let api = LocalSupportApi::new(Arc::new(assistant));

        let chat = api.chat("hack").await.unwrap();
        assert!(!chat.success);
        assert!(chat.error.unwrap().starts_with("Invalid input: "));

        let analysis = api.analyze("").await.unwrap();
        assert_eq!(analysis, AnalyzeOutcome::Rejected(400));
    }
}
