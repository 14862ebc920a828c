//! Terminal utilities: raw mode, the stdout display and key mapping.
//!
//! Wraps crossterm's terminal operations and provides a RAII guard that
//! automatically restores the terminal state on drop.

use std::io::Write;

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal;
use wterm_client::{DisplaySink, KeyInput};
use wterm_core::TermResult;

/// RAII guard that keeps the terminal in raw mode while alive.
pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    /// Enter raw terminal mode.
    pub fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
        Ok(Self { active: true })
    }

    /// Leave raw mode temporarily, e.g. while an external editor runs.
    pub fn suspend(&mut self) -> Result<()> {
        if self.active {
            terminal::disable_raw_mode().context("failed to disable raw terminal mode")?;
            self.active = false;
        }
        Ok(())
    }

    pub fn resume(&mut self) -> Result<()> {
        if !self.active {
            terminal::enable_raw_mode().context("failed to enable raw terminal mode")?;
            self.active = true;
        }
        Ok(())
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = terminal::disable_raw_mode();
        }
    }
}

/// Get the current terminal size as (columns, rows).
///
/// Falls back to (80, 24) if the size cannot be determined.
pub fn get_terminal_size() -> (u16, u16) {
    terminal::size().unwrap_or((80, 24))
}

/// Display sink writing straight to stdout.
#[derive(Debug, Default)]
pub struct StdoutDisplay {
    size: (u16, u16),
}

impl StdoutDisplay {
    pub fn new() -> Self {
        Self {
            size: get_terminal_size(),
        }
    }

    /// Write a local notice on its own line.
    pub fn notice(&mut self, text: &str) -> TermResult<()> {
        self.write(&format!("\r\n[wterm] {text}\r\n"))
    }
}

impl DisplaySink for StdoutDisplay {
    fn write(&mut self, text: &str) -> TermResult<()> {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(text.as_bytes())?;
        stdout.flush()?;
        Ok(())
    }

    fn refit(&mut self, cols: u16, rows: u16) {
        if self.size != (cols, rows) {
            tracing::debug!(cols, rows, "terminal resized");
            self.size = (cols, rows);
        }
    }
}

/// What a key press means to the session loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyInput),
    /// Ctrl+] ends the session (like ssh `~.`).
    Disconnect,
    /// Ctrl+R drops the channel and connects again.
    Reconnect,
}

/// Map a crossterm key event. Keys the session has no use for map to `None`.
pub fn key_event_to_input(event: &KeyEvent) -> Option<InputEvent> {
    if event.kind == KeyEventKind::Release {
        return None;
    }
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

    match event.code {
        KeyCode::Char(']') if ctrl => Some(InputEvent::Disconnect),
        KeyCode::Char('r') | KeyCode::Char('R') if ctrl => Some(InputEvent::Reconnect),
        KeyCode::Char('c') | KeyCode::Char('C') if ctrl => {
            Some(InputEvent::Key(KeyInput::Interrupt))
        }
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(' ') => Some(InputEvent::Key(KeyInput::Space)),
        KeyCode::Char(c) => Some(InputEvent::Key(KeyInput::Char(c))),
        KeyCode::Enter => Some(InputEvent::Key(KeyInput::Enter)),
        KeyCode::Backspace => Some(InputEvent::Key(KeyInput::Backspace)),
        KeyCode::Tab => Some(InputEvent::Key(KeyInput::Char('\t'))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn terminal_size_returns_nonzero() {
        let (cols, rows) = get_terminal_size();
        assert!(cols > 0);
        assert!(rows > 0);
    }

    #[test]
    fn printable_keys() {
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char('a'), KeyModifiers::NONE)),
            Some(InputEvent::Key(KeyInput::Char('a')))
        );
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char('A'), KeyModifiers::SHIFT)),
            Some(InputEvent::Key(KeyInput::Char('A')))
        );
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char(' '), KeyModifiers::NONE)),
            Some(InputEvent::Key(KeyInput::Space))
        );
    }

    #[test]
    fn editing_keys() {
        assert_eq!(
            key_event_to_input(&key(KeyCode::Enter, KeyModifiers::NONE)),
            Some(InputEvent::Key(KeyInput::Enter))
        );
        assert_eq!(
            key_event_to_input(&key(KeyCode::Backspace, KeyModifiers::NONE)),
            Some(InputEvent::Key(KeyInput::Backspace))
        );
        assert_eq!(key_event_to_input(&key(KeyCode::Up, KeyModifiers::NONE)), None);
    }

    #[test]
    fn control_keys() {
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(InputEvent::Key(KeyInput::Interrupt))
        );
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char(']'), KeyModifiers::CONTROL)),
            Some(InputEvent::Disconnect)
        );
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char('r'), KeyModifiers::CONTROL)),
            Some(InputEvent::Reconnect)
        );
        assert_eq!(
            key_event_to_input(&key(KeyCode::Char('x'), KeyModifiers::CONTROL)),
            None
        );
    }

    #[test]
    fn releases_are_ignored() {
        let mut event = key(KeyCode::Char('a'), KeyModifiers::NONE);
        event.kind = KeyEventKind::Release;
        assert_eq!(key_event_to_input(&event), None);
    }
}
