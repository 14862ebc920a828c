//! Buffer for file content streamed during a vi capture.

/// Accumulates captured text. Only holds data while the session is capturing.
#[derive(Debug, Default, Clone)]
pub struct CaptureBuffer {
    text: String,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self {
            text: String::new(),
        }
    }

    pub fn append(&mut self, piece: &str) {
        self.text.push_str(piece);
    }

    /// Take the captured file, trailing whitespace removed, leaving the buffer empty.
    pub fn finish(&mut self) -> String {
        let mut text = std::mem::take(&mut self.text);
        text.truncate(text.trim_end().len());
        text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finish_trims_and_empties() {
        let mut buf = CaptureBuffer::new();
        buf.append("line1\n");
        buf.append("line2\n\n");
        assert_eq!(buf.finish(), "line1\nline2");
        assert_eq!(buf.as_str(), "");
    }

    #[test]
    fn leading_indentation_is_kept() {
        let mut buf = CaptureBuffer::new();
        buf.append("  indented\n");
        assert_eq!(buf.finish(), "  indented");
    }
}
