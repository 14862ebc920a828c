//! Local line editing: the pending command line and the keys that drive it.

/// Sequence that visually erases the last character on the terminal.
pub const ERASE_SEQUENCE: &str = "\x08 \x08";

/// A key as delivered by the input source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyInput {
    /// Printable character.
    Char(char),
    /// Space delivered as a named key rather than a character.
    Space,
    Backspace,
    Enter,
    /// Ctrl+C.
    Interrupt,
}

impl KeyInput {
    /// Map raw terminal data (`onData`-style) to keys.
    ///
    /// DEL is Backspace, CR is Enter, ETX is Interrupt; everything else
    /// becomes printable input.
    pub fn from_data(data: &str) -> Vec<KeyInput> {
        data.chars()
            .map(|c| match c {
                '\x7f' => KeyInput::Backspace,
                '\r' => KeyInput::Enter,
                '\x03' => KeyInput::Interrupt,
                ' ' => KeyInput::Space,
                other => KeyInput::Char(other),
            })
            .collect()
    }
}

/// Append/erase-only command line buffer.
#[derive(Debug, Default, Clone)]
pub struct LineInput {
    buf: String,
}

impl LineInput {
    pub fn new() -> Self {
        Self { buf: String::new() }
    }

    /// Append a character; returns the text to echo locally.
    pub fn push(&mut self, c: char) -> String {
        self.buf.push(c);
        c.to_string()
    }

    /// Remove the last character.
    ///
    /// Returns the erase sequence only if something was removed.
    pub fn erase(&mut self) -> Option<&'static str> {
        self.buf.pop().map(|_| ERASE_SEQUENCE)
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}
