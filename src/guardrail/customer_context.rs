//! Requires the customer to identify themselves before support starts.
//!
//! Not part of the default chain; enable it when the deployment expects a
//! ticket number up front.

use regex::Regex;

use super::{GuardrailResult, InputContext, InputGuardrail};

#[derive(Debug)]
pub struct CustomerContextGuardrail {
    ticket: Regex,
}

impl Default for CustomerContextGuardrail {
    fn default() -> Self {
        Self::new()
    }
}

impl CustomerContextGuardrail {
    pub fn new() -> Self {
        Self {
            ticket: Regex::new(r"\b[A-Z]{2,3}-\d{4,6}\b").expect("ticket pattern is a valid regex"),
        }
    }

    fn contains_customer_info(&self, text: &str) -> bool {
        text.to_lowercase().contains("name") || self.ticket.is_match(text)
    }
}

impl InputGuardrail for CustomerContextGuardrail {
    fn name(&self) -> &'static str {
        "CustomerContextInputGuardrail"
    }

    fn validate(&self, input: &InputContext<'_>) -> GuardrailResult {
        if self.contains_customer_info(input.text) {
            GuardrailResult::Success
        } else {
            GuardrailResult::failure("Please provide your name and ticket number to begin")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> GuardrailResult {
        CustomerContextGuardrail::new().validate(&InputContext { text, memory: &[] })
    }

    #[test]
    fn test_accepts_name_or_ticket() {
        assert_eq!(check("My name is Sam, my order is late"), GuardrailResult::Success);
        assert_eq!(check("Following up on SUP-12345"), GuardrailResult::Success);
    }

    #[test]
    fn test_rejects_anonymous_message() {
        assert!(matches!(check("my order is late"), GuardrailResult::Failure(_)));
        assert!(matches!(check("ticket sup-1234"), GuardrailResult::Failure(_)));
    }
}
