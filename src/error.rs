//! HTTP error bodies for failures outside the support endpoints' own schema.

use std::collections::BTreeMap;

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Generic error body: `{code, message, details, timestamp, metadata}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Vec::new(),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Request-level failures raised before a handler runs its own logic.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request body could not be read as the expected JSON.
    #[error("Invalid request body: {detail}")]
    InvalidRequest { path: String, detail: String },

    /// The global limiter has no tokens left.
    #[error("Too many requests")]
    RateLimited { path: String },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    fn body(&self) -> ErrorResponse {
        let body = match self {
            Self::InvalidRequest { path, detail } => {
                ErrorResponse::new("INVALID_REQUEST", "The request body is not valid")
                    .with_detail(detail.clone())
                    .with_metadata("path", path.clone())
            }
            Self::RateLimited { path } => {
                ErrorResponse::new("RATE_LIMITED", "Too many requests. Please slow down.")
                    .with_metadata("path", path.clone())
            }
        };
        body.with_metadata("requestId", Uuid::new_v4().to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::warn!(
            name: "http.request.rejected",
            status = self.status().as_u16(),
            error = %self,
            "Request rejected"
        );
        (self.status(), Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_body() {
        let err = ApiError::RateLimited {
            path: "/api/support/chat".into(),
        };
        assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

        let v = serde_json::to_value(err.body()).unwrap();
        assert_eq!(v["code"], "RATE_LIMITED");
        assert_eq!(v["metadata"]["path"], "/api/support/chat");
        assert!(v["details"].as_array().unwrap().is_empty());
        assert!(v["timestamp"].is_string());
        assert_eq!(v["metadata"]["requestId"].as_str().unwrap().len(), 36);
    }

    #[test]
    fn test_invalid_request_carries_detail() {
        let err = ApiError::InvalidRequest {
            path: "/api/support/analyze".into(),
            detail: "missing field `message`".into(),
        };
        let body = err.body();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body.details, ["missing field `message`"]);
    }
}
