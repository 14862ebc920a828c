//! Heuristic classification of inbound chunks.
//!
//! The bridge delivers raw shell output with no framing: the echoed command
//! comes first, the next prompt comes last, and either may be split across
//! messages. Everything that recognises those shapes lives behind
//! [`ResponseClassifier`], so the controller never matches text itself.

/// Error text printed by `cat` when the capture target does not exist.
pub const NOT_FOUND_TEXT: &str = "No such file or directory";

/// Newline written where a prompt is treated as a line-break marker.
pub const PROMPT_BREAK: &str = "\r\n";

/// Classification of the first response chunk to a submitted command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirstResponse {
    /// Text to forward to the display.
    pub display: String,
    /// The chunk with the echo removed, before prompt substitution.
    /// `None` when the chunk did not start with the command.
    pub echo_stripped: Option<String>,
}

/// Outcome of one chunk during a capture session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureStep {
    /// The file does not exist; `prompt_seen` tells whether the prompt came with it.
    NotFound { prompt_seen: bool },
    /// Add this text to the buffer and keep capturing.
    Append(String),
    /// Add this text to the buffer and hand the file to the editor.
    Complete(String),
}

/// Recognises echo, prompt and capture shapes in inbound text.
pub trait ResponseClassifier: Send {
    /// Strip the echo of `command` and the prompt from a first response chunk.
    fn first_response(&self, chunk: &str, command: &str, prompt: &str) -> FirstResponse;

    /// Whether `chunk` shows the prompt, i.e. the response has ended.
    /// A blank prompt is never shown.
    fn shows_prompt(&self, chunk: &str, prompt: &str) -> bool;

    /// Classify a chunk received while capturing the output of `command`.
    fn capture_step(&self, chunk: &str, command: &str, prompt: &str) -> CaptureStep;

    /// Whether `chunk` confirms that the write command `command` was accepted.
    fn save_confirmed(&self, chunk: &str, command: &str) -> bool;
}

/// Default classifier: substring matching against the tracked prompt.
///
/// Assumes the prompt text never appears inside command output.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptClassifier;

impl PromptClassifier {
    fn replace_last(haystack: &str, needle: &str, with: &str) -> Option<String> {
        let at = haystack.rfind(needle)?;
        let mut out = String::with_capacity(haystack.len());
        out.push_str(&haystack[..at]);
        out.push_str(with);
        out.push_str(&haystack[at + needle.len()..]);
        Some(out)
    }

    fn truncate_at_prompt<'a>(text: &'a str, prompt: &str) -> &'a str {
        match text.rfind(prompt.trim()) {
            Some(at) => &text[..at],
            None => text,
        }
    }
}

impl ResponseClassifier for PromptClassifier {
    fn first_response(&self, chunk: &str, command: &str, prompt: &str) -> FirstResponse {
        let Some(rest) = chunk.strip_prefix(command) else {
            tracing::debug!("first chunk does not echo the command, forwarding verbatim");
            return FirstResponse {
                display: chunk.to_string(),
                echo_stripped: None,
            };
        };

        let trimmed = prompt.trim();
        let display = if trimmed.is_empty() {
            None
        } else if rest.contains(prompt) {
            Self::replace_last(rest, prompt, PROMPT_BREAK)
        } else {
            Self::replace_last(rest, trimmed, PROMPT_BREAK)
        };

        FirstResponse {
            display: display.unwrap_or_else(|| rest.to_string()),
            echo_stripped: Some(rest.to_string()),
        }
    }

    fn shows_prompt(&self, chunk: &str, prompt: &str) -> bool {
        let trimmed = prompt.trim();
        !trimmed.is_empty() && chunk.contains(trimmed)
    }

    fn capture_step(&self, chunk: &str, command: &str, prompt: &str) -> CaptureStep {
        let prompt_seen = self.shows_prompt(chunk, prompt);

        if chunk.contains(NOT_FOUND_TEXT) {
            return CaptureStep::NotFound { prompt_seen };
        }

        match (chunk.strip_prefix(command), prompt_seen) {
            // Only the line break after the echo goes; the body keeps its own.
            (Some(rest), false) => {
                CaptureStep::Append(rest.trim_start_matches(['\r', '\n']).to_string())
            }
            (Some(rest), true) => {
                CaptureStep::Complete(Self::truncate_at_prompt(rest, prompt).trim().to_string())
            }
            (None, true) => {
                CaptureStep::Complete(Self::truncate_at_prompt(chunk, prompt).trim().to_string())
            }
            (None, false) => CaptureStep::Append(chunk.to_string()),
        }
    }

    fn save_confirmed(&self, chunk: &str, command: &str) -> bool {
        match command.split_whitespace().next() {
            Some(token) => chunk.trim_start().starts_with(token),
            None => false,
        }
    }
}
