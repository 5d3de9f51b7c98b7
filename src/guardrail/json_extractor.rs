//! Pulls a typed JSON object out of a free-form model reply.
//!
//! Models like to wrap JSON in prose or markdown fences. The extractor strips
//! fences, takes the outermost `{...}` span and deserializes it; anything
//! unparseable turns into a reprompt asking for valid JSON.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use super::{GuardrailResult, OutputContext, OutputGuardrail};

pub struct JsonExtractor<T> {
    _target: PhantomData<fn() -> T>,
}

impl<T> std::fmt::Debug for JsonExtractor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonExtractor")
            .field("target", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> Default for JsonExtractor<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Slice from the first `{` to the last `}`, if both exist in order.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

impl<T> JsonExtractor<T> {
    pub fn new() -> Self {
        Self {
            _target: PhantomData,
        }
    }

    fn invalid_json() -> GuardrailResult {
        GuardrailResult::reprompt(
            "Invalid JSON",
            "Make sure you return a valid JSON object following the specified format",
        )
    }
}

impl<T: DeserializeOwned> JsonExtractor<T> {
    /// Parse the reply, or explain why it must be regenerated.
    pub fn extract(&self, response: &str) -> Result<T, GuardrailResult> {
        let candidate = outermost_object(response).ok_or_else(Self::invalid_json)?;
        serde_json::from_str(candidate).map_err(|e| {
            tracing::debug!(
                name: "guardrail.json.invalid",
                error = %e,
                "Model reply did not deserialize"
            );
            Self::invalid_json()
        })
    }
}

impl<T: DeserializeOwned> OutputGuardrail for JsonExtractor<T> {
    fn name(&self) -> &'static str {
        "JsonExtractorOutputGuardrail"
    }

    fn validate(&self, output: &OutputContext<'_>) -> GuardrailResult {
        match self.extract(output.response) {
            Ok(_) => GuardrailResult::Success,
            Err(verdict) => verdict,
        }
    }
}
