use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static GLOBAL: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Redacts credentials from text before it is logged or displayed
///
/// Applied to upstream error bodies and transport errors, which may echo
/// API keys (Gemini keys travel in the `key` query parameter) or database
/// URLs with passwords.
#[derive(Clone)]
pub struct SecretScrubber {
    api_key_pattern: Regex,
    google_key_pattern: Regex,
    query_key_pattern: Regex,
    bearer_pattern: Regex,
    url_password_pattern: Regex,
    token_pattern: Regex,
}

impl SecretScrubber {
    /// Create a new secret scrubber
    pub fn new() -> Self {
        Self {
            // OpenAI-style keys: sk-..., sk-proj-...
            api_key_pattern: compile(r"sk-[a-zA-Z0-9_-]{20,}"),
            // Google API keys
            google_key_pattern: compile(r"AIza[0-9A-Za-z_-]{20,}"),
            query_key_pattern: compile(r"([?&]key=)[^&\s]+"),
            bearer_pattern: compile(r"Bearer\s+[a-zA-Z0-9_.\-]+"),
            url_password_pattern: compile(r"(postgres(?:ql)?://[^:/@\s]+:)[^@\s]+@"),
            token_pattern: compile(
                r#"(["']?(?:api_key|apikey|token|secret)["']?\s*[:=]\s*)["']?[a-zA-Z0-9_.\-]{20,}["']?"#,
            ),
        }
    }

    /// Process-wide instance.
    pub fn global() -> &'static Self {
        &GLOBAL
    }

    /// Scrub a message of sensitive data
    pub fn scrub(&self, message: &str) -> String {
        let scrubbed = self.api_key_pattern.replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = self
            .google_key_pattern
            .replace_all(&scrubbed, "[API_KEY_REDACTED]");
        let scrubbed = self.query_key_pattern.replace_all(&scrubbed, "${1}[REDACTED]");
        let scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self
            .url_password_pattern
            .replace_all(&scrubbed, "${1}[REDACTED]@");
        let scrubbed = self.token_pattern.replace_all(&scrubbed, "${1}[REDACTED]");
        scrubbed.into_owned()
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid scrubbing pattern {pattern}: {e}"))
}
