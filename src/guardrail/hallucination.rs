//! Flags replies that drift away from retrieved context.
//!
//! Only active when the exchange carries retrieved passages; without
//! retrieval there is nothing to ground against and the reply passes.

use std::collections::HashSet;

use super::{GuardrailResult, OutputContext, OutputGuardrail};

/// Share of ungrounded sentences tolerated before reprompting.
const MAX_UNGROUNDED_RATIO: f64 = 0.2;
/// Sentences at or below this length are too short to count as facts.
const MIN_FACT_CHARS: usize = 10;

#[derive(Debug, Default)]
pub struct HallucinationDetectionGuardrail;

impl HallucinationDetectionGuardrail {
    pub fn new() -> Self {
        Self
    }
}

/// Lowercased sentences long enough to carry a claim.
fn extract_key_facts(text: &str) -> HashSet<String> {
    text.split(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| s.chars().count() > MIN_FACT_CHARS)
        .map(str::to_lowercase)
        .collect()
}

fn is_grounded(fact: &str, context: &HashSet<String>) -> bool {
    context
        .iter()
        .any(|c| c.contains(fact) || fact.contains(c.as_str()))
}

impl OutputGuardrail for HallucinationDetectionGuardrail {
    fn name(&self) -> &'static str {
        "HallucinationDetectionGuardrail"
    }

    fn validate(&self, output: &OutputContext<'_>) -> GuardrailResult {
        let Some(passages) = output.retrieved else {
            return GuardrailResult::Success;
        };

        let response_facts = extract_key_facts(output.response);
        let context_facts: HashSet<String> = passages
            .iter()
            .flat_map(|p| extract_key_facts(p))
            .collect();

        let ungrounded = response_facts
            .iter()
            .filter(|f| !is_grounded(f, &context_facts))
            .count();

        if ungrounded as f64 > response_facts.len() as f64 * MAX_UNGROUNDED_RATIO {
            return GuardrailResult::reprompt(
                "Response contains potentially hallucinated information",
                "Please base your response only on the provided context. Do not add information that is not explicitly stated.",
            );
        }
        GuardrailResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_passes_without_retrieval() {
        let result = HallucinationDetectionGuardrail::new().validate(&OutputContext {
            response: "Our office on the moon opens at nine.",
            retrieved: None,
        });
        assert_eq!(result, GuardrailResult::Success);
    }

    #[test]
    fn test_grounded_reply_passes() {
        let passages = vec!["Refunds are processed within five days. Shipping is free over fifty dollars.".to_string()];
        let result = HallucinationDetectionGuardrail::new().validate(&OutputContext {
            response: "Refunds are processed within five days.",
            retrieved: Some(&passages),
        });
        assert_eq!(result, GuardrailResult::Success);
    }

    #[test]
    fn test_ungrounded_reply_is_reprompted() {
        let passages = vec!["Refunds are processed within five days.".to_string()];
        let result = HallucinationDetectionGuardrail::new().validate(&OutputContext {
            response: "Refunds are processed within five days. We also give every customer a free laptop.",
            retrieved: Some(&passages),
        });
        assert!(matches!(result, GuardrailResult::Reprompt { .. }));
    }
}
