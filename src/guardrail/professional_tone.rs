//! Keeps assistant replies courteous and short.

use super::{GuardrailResult, OutputContext, OutputGuardrail};

const UNPROFESSIONAL_PHRASES: &[&str] = &["that's weird", "that's dumb", "whatever", "i don't know"];
const COURTESY_MARKERS: &[&str] = &["thank you", "please", "happy to help"];
const MAX_REPLY_CHARS: usize = 1000;

#[derive(Debug, Default)]
pub struct ProfessionalToneGuardrail;

impl ProfessionalToneGuardrail {
    pub fn new() -> Self {
        Self
    }
}

impl OutputGuardrail for ProfessionalToneGuardrail {
    fn name(&self) -> &'static str {
        "ProfessionalToneOutputGuardrail"
    }

    fn validate(&self, output: &OutputContext<'_>) -> GuardrailResult {
        let text = output.response.to_lowercase();

        if UNPROFESSIONAL_PHRASES.iter().any(|p| text.contains(p)) {
            return GuardrailResult::reprompt(
                "Unprofessional tone detected",
                "Please maintain a professional and helpful tone",
            );
        }

        if text.chars().count() > MAX_REPLY_CHARS {
            return GuardrailResult::reprompt(
                "Response too long",
                "Please keep your response under 1000 characters.",
            );
        }

        if !COURTESY_MARKERS.iter().any(|m| text.contains(m)) {
            return GuardrailResult::reprompt(
                "Response lacks professional courtesy",
                "Please include polite and helpful language in your response.",
            );
        }

        GuardrailResult::Success
    }
}
