//! Grounded prompt construction for the answer generator.

use crate::domain::ports::GenerationRequest;

const SYSTEM_PROMPT: &str = "\
You are GUEZI, a knowledgeable and compassionate assistant specializing in the \
teachings of Rabbi Nachman of Breslov.

Guidelines:
- Base your answer ONLY on the retrieved passages provided below. Do not invent teachings.
- If the passages do not contain the answer, say that you do not have specific \
information about it in your sources.
- Cite sources exactly as they are labelled (for example \"Likutei Moharan 1\").
- Be warm and encouraging, and say so honestly when you are unsure.";

const NO_CONTEXT_NOTE: &str = "\
Note: No relevant passages were found. Tell the user that you do not have \
information on this topic in your sources.";

const DEFAULT_MAX_SOURCE_CHARS: usize = 1500;

/// Renders a [`GenerationRequest`] into a single grounded prompt
#[derive(Debug, Clone, Copy)]
pub struct PromptBuilder {
    max_source_chars: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOURCE_CHARS)
    }
}

impl PromptBuilder {
    pub const fn new(max_source_chars: usize) -> Self {
        Self { max_source_chars }
    }

    /// The numbered source block, or `None` when there is no context.
    pub fn context_block(&self, request: &GenerationRequest) -> Option<String> {
        if !request.is_grounded() {
            return None;
        }

        let parts: Vec<String> = request
            .context
            .iter()
            .enumerate()
            .map(|(i, passage)| {
                let text: String = passage.text.chars().take(self.max_source_chars).collect();
                format!(
                    "[Source {}: {} - {}]\nContent: {text}\n",
                    i + 1,
                    passage.title,
                    passage.reference
                )
            })
            .collect();

        Some(parts.join("\n---\n"))
    }

    pub fn build(&self, request: &GenerationRequest) -> String {
        let grounding = match self.context_block(request) {
            Some(context) => format!(
                "Relevant passages from Breslov texts (USE ONLY THESE SOURCES):\n{context}"
            ),
            None => NO_CONTEXT_NOTE.to_string(),
        };

        let language = request
            .language
            .map(|language| format!("\n\nIMPORTANT: {}", language.instruction()))
            .unwrap_or_default();

        format!(
            "{SYSTEM_PROMPT}{language}\n\n{grounding}\n\nUser's question: {}\n\nGUEZI's response:",
            request.question.trim()
        )
    }
}
