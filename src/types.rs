//! Wire types shared by the support API, its HTTP client and the widget.

use serde::{Deserialize, Serialize};

/// Request body for both `/api/support/chat` and `/api/support/analyze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// User message content.
    pub message: String,
}

/// Response body of `/api/support/chat`, on success and on failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub success: bool,
    /// Assistant reply, present when `success` is true.
    #[serde(default)]
    pub response: Option<String>,
    /// User-facing reason, present when `success` is false.
    #[serde(default)]
    pub error: Option<String>,
}

impl ChatResponse {
    pub fn ok(response: impl Into<String>) -> Self {
        Self {
            success: true,
            response: Some(response.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
        }
    }
}

/// Structured reading of a customer query. Every field is optional; absent
/// fields are omitted on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Brief summary of what the customer needs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    /// One of ACCOUNT, BILLING, TECHNICAL, PRODUCT, GENERAL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Categorization confidence in `[0, 1]`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<String>,
    /// LOW, MEDIUM or HIGH.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    /// POSITIVE, NEUTRAL or NEGATIVE.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentiment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_response: Option<String>,
}
