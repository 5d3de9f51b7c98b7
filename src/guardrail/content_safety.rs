//! Length, blocklist and obfuscation checks on raw user input.

use regex::Regex;

use super::{GuardrailResult, InputContext, InputGuardrail};

const PROHIBITED_WORDS: &[&str] = &[
    "hack",
    "exploit",
    "bypass",
    "illegal",
    "fraud",
    "crack",
    "breach",
    "penetrate",
    "malware",
    "virus",
    "trojan",
    "backdoor",
    "phishing",
    "spam",
    "scam",
    "steal",
    "theft",
    "identity",
    "password",
    "credential",
];

const THREAT_PATTERNS: &[&str] = &[
    r"(?i)h[4@]ck",
    r"(?i)cr[4@]ck",
    r"(?i)expl[0o]it",
    r"(?i)byp[4@]ss",
    r"(?i)m[4@]lw[4@]re",
    r"(?i)[h4@][a@][c3][k4@]",
    r"(?i)\b[a-z]*[h4@][a@4]*[c3][k4@][a-z]*\b",
    r"(?i)[\w\s]*(?:how\s+to|teach\s+me|show\s+me)\s+(?:hack|exploit|bypass)",
];

const SPECIAL_CHARS: &str = "@#$%^&*()_+-=[]{}|;':\",./<>?";

/// Share of special characters above which a message counts as obfuscated.
const MAX_SPECIAL_RATIO: f64 = 0.15;

/// Shortest message worth sending to the model.
const MIN_LENGTH: usize = 5;

/// Rejects messages that are empty, too short or long, or look like attempts
/// to talk about (or disguise talk about) security attacks.
#[derive(Debug)]
pub struct ContentSafetyGuardrail {
    max_length: usize,
    threat_patterns: Vec<Regex>,
}

impl ContentSafetyGuardrail {
    pub fn new(max_length: usize) -> Self {
        let threat_patterns = THREAT_PATTERNS
            .iter()
            .map(|p| Regex::new(p).expect("threat pattern is a valid regex"))
            .collect();
        Self {
            max_length,
            threat_patterns,
        }
    }
}

fn contains_suspicious_obfuscation(text: &str) -> bool {
    let total = text.chars().count();
    if total == 0 {
        return false;
    }
    let special = text.chars().filter(|c| SPECIAL_CHARS.contains(*c)).count();
    special as f64 / total as f64 > MAX_SPECIAL_RATIO
}

impl InputGuardrail for ContentSafetyGuardrail {
    fn name(&self) -> &'static str {
        "ContentSafetyInputGuardrail"
    }

    fn validate(&self, input: &InputContext<'_>) -> GuardrailResult {
        let original = input.text;
        let text = original.to_lowercase();

        if original.chars().count() > self.max_length {
            return GuardrailResult::failure(format!(
                "Your message is too long. Please keep it under {} characters.",
                self.max_length
            ));
        }
        if text.trim().is_empty() {
            return GuardrailResult::failure("Your message cannot be empty.");
        }
        if text.chars().count() < MIN_LENGTH {
            return GuardrailResult::failure(
                "Your message is too short. Please provide more details.",
            );
        }

        if PROHIBITED_WORDS.iter().any(|w| text.contains(w)) {
            return GuardrailResult::failure(
                "Your message contains prohibited content related to security threats.",
            );
        }

        if self.threat_patterns.iter().any(|p| p.is_match(original)) {
            return GuardrailResult::failure(
                "Your message contains potentially harmful content patterns.",
            );
        }

        if contains_suspicious_obfuscation(original) {
            return GuardrailResult::failure(
                "Your message contains suspicious character substitutions.",
            );
        }

        GuardrailResult::Success
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str) -> GuardrailResult {
        ContentSafetyGuardrail::new(100).validate(&InputContext { text, memory: &[] })
    }

    fn failure(msg: &str) -> GuardrailResult {
        GuardrailResult::failure(msg)
    }

    #[test]
    fn test_accepts_valid_input() {
        for text in [
            "Hello, I need help with my account settings",
            "Can you help me with my login issue?",
            "How do I update my profile information?",
            "What are the steps to contact support?",
        ] {
            assert_eq!(check(text), GuardrailResult::Success, "{text}");
        }
    }

    #[test]
    fn test_length_bounds() {
        assert_eq!(
            check("   "),
            failure("Your message cannot be empty.")
        );
        assert_eq!(
            check("Hi"),
            failure("Your message is too short. Please provide more details.")
        );
        assert_eq!(
            check(&"a".repeat(101)),
            failure("Your message is too long. Please keep it under 100 characters.")
        );
    }

    #[test]
    fn test_rejects_prohibited_words_in_any_case() {
        for text in [
            "hack the system",
            "how to exploit vulnerability",
            "ByPaSs security",
            "install malware",
            "phishing techniques",
            "cr@ck the password",
            "Teach Me To EXPLOIT",
        ] {
            assert_eq!(
                check(text),
                failure("Your message contains prohibited content related to security threats."),
                "{text}"
            );
        }
    }

    #[test]
    fn test_rejects_obfuscated_patterns() {
        for text in [
            "h4ck the system",
            "how to h@ck",
            "byp@ss security",
            "m@lw@re installation",
        ] {
            assert_eq!(
                check(text),
                failure("Your message contains potentially harmful content patterns."),
                "{text}"
            );
        }
    }

    #[test]
    fn test_rejects_symbol_soup() {
        assert_eq!(
            check("H3!!0 @#$%^ &*()_ +"),
            failure("Your message contains suspicious character substitutions.")
        );
    }
}
