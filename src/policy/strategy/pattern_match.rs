//! Regex match on the extracted parameter.

use regex::Regex;

/// Passes when the pattern matches anywhere in the value (inverted by `reverse`).
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pattern: Regex,
    reverse: bool,
}

impl PatternMatch {
    pub fn new(pattern: Regex, reverse: bool) -> Self {
        Self { pattern, reverse }
    }

    pub fn check(&self, value: &str) -> bool {
        self.pattern.is_match(value) != self.reverse
    }
}
