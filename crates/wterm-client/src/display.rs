//! Display collaborator: where terminal output goes.

use wterm_core::TermResult;

/// Receives everything the session wants shown to the user.
pub trait DisplaySink {
    /// Write raw terminal text (may contain control sequences).
    fn write(&mut self, text: &str) -> TermResult<()>;

    /// Give keyboard focus back to the terminal.
    fn focus(&mut self) {}

    /// The viewport changed size. Cosmetic only.
    fn refit(&mut self, _cols: u16, _rows: u16) {}
}

/// In-memory display, for headless use and tests.
#[derive(Debug, Default, Clone)]
pub struct BufferDisplay {
    pub output: String,
    pub focus_count: usize,
    pub size: Option<(u16, u16)>,
}

impl BufferDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take everything written so far.
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl DisplaySink for BufferDisplay {
    fn write(&mut self, text: &str) -> TermResult<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn focus(&mut self) {
        self.focus_count += 1;
    }

    fn refit(&mut self, cols: u16, rows: u16) {
        self.size = Some((cols, rows));
    }
}
