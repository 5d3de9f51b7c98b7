//! Stops users from circling on the same question within one conversation.

use super::{GuardrailResult, InputContext, InputGuardrail};

/// Memory messages that may already contain the question.
const MAX_QUESTIONS_PER_TOPIC: usize = 5;

#[derive(Debug, Default)]
pub struct ConversationContextGuardrail;

impl ConversationContextGuardrail {
    pub fn new() -> Self {
        Self
    }
}

impl InputGuardrail for ConversationContextGuardrail {
    fn name(&self) -> &'static str {
        "ConversationContextGuardrail"
    }

    fn validate(&self, input: &InputContext<'_>) -> GuardrailResult {
        if input.memory.is_empty() {
            return GuardrailResult::Success;
        }

        let question = input.text.to_lowercase();
        let similar = input
            .memory
            .iter()
            .filter(|m| m.content.to_lowercase().contains(&question))
            .count();

        if similar > MAX_QUESTIONS_PER_TOPIC {
            return GuardrailResult::failure(
                "You've asked similar questions multiple times. Please try a different topic.",
            );
        }
        GuardrailResult::Success
    }
}
