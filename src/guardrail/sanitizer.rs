//! Normalizes user input before it reaches later guardrails and the model.

use regex::Regex;

use super::{GuardrailResult, InputContext, InputGuardrail};

const MAX_SANITIZED_CHARS: usize = 500;
const STRIPPED_CHARS: &[char] = &['<', '>', '{', '}', '[', ']', '|', '\\'];

/// Collapses whitespace, strips markup-like characters and caps the length.
/// Never rejects.
#[derive(Debug)]
pub struct InputSanitizerGuardrail {
    whitespace: Regex,
}

impl Default for InputSanitizerGuardrail {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSanitizerGuardrail {
    pub fn new() -> Self {
        Self {
            whitespace: Regex::new(r"\s+").expect("whitespace pattern is a valid regex"),
        }
    }

    pub fn sanitize(&self, text: &str) -> String {
        let collapsed = self.whitespace.replace_all(text, " ");
        let mut cleaned: String = collapsed
            .trim()
            .chars()
            .filter(|c| !STRIPPED_CHARS.contains(c))
            .collect();

        if cleaned.chars().count() > MAX_SANITIZED_CHARS {
            cleaned = cleaned.chars().take(MAX_SANITIZED_CHARS).collect();
            cleaned.push_str("...");
        }
        cleaned
    }
}

impl InputGuardrail for InputSanitizerGuardrail {
    fn name(&self) -> &'static str {
        "InputSanitizerGuardrail"
    }

    fn validate(&self, input: &InputContext<'_>) -> GuardrailResult {
        GuardrailResult::SuccessWith(self.sanitize(input.text))
    }
}
