//! External editor round-trip for captured files.

use std::io::Write;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use tracing::debug;

/// Editor to launch: the configured one, then `$VISUAL`, `$EDITOR`, then `vi`.
pub fn resolve_editor(configured: Option<&str>) -> String {
    configured
        .filter(|e| !e.trim().is_empty())
        .map(str::to_string)
        .or_else(|| std::env::var("VISUAL").ok().filter(|e| !e.trim().is_empty()))
        .or_else(|| std::env::var("EDITOR").ok().filter(|e| !e.trim().is_empty()))
        .unwrap_or_else(|| "vi".to_string())
}

/// Open `text` in `editor` and return the edited text.
///
/// `filename` only picks the temp file's extension so the editor can choose
/// syntax highlighting. Returns `None` when the text came back unchanged.
pub fn edit_text(editor: &str, filename: &str, text: &str) -> Result<Option<String>> {
    let suffix = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix("wterm-")
        .suffix(&suffix)
        .tempfile()
        .context("failed to create temp file for editing")?;
    file.write_all(text.as_bytes())?;
    file.flush()?;

    let mut parts = editor.split_whitespace();
    let program = parts.next().context("editor command is empty")?;
    debug!(editor = %editor, path = %file.path().display(), "launching editor");

    let status = Command::new(program)
        .args(parts)
        .arg(file.path())
        .status()
        .with_context(|| format!("failed to launch editor '{editor}'"))?;
    if !status.success() {
        anyhow::bail!("editor '{editor}' exited with {status}");
    }

    let edited = std::fs::read_to_string(file.path())
        .context("failed to read edited file")?;
    if edited == text {
        Ok(None)
    } else {
        Ok(Some(edited))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_editor_wins() {
        assert_eq!(resolve_editor(Some("nano -w")), "nano -w");
    }

    #[test]
    fn blank_configured_editor_falls_through() {
        assert!(!resolve_editor(Some("  ")).trim().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn unchanged_text_is_none() {
        assert_eq!(edit_text("true", "f.txt", "hello\n").unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn edited_text_is_returned() {
        let edited = edit_text("sed -i s/hello/bye/", "f.txt", "hello\n").unwrap();
        assert_eq!(edited.as_deref(), Some("bye\n"));
    }

    #[cfg(unix)]
    #[test]
    fn failing_editor_is_an_error() {
        assert!(edit_text("false", "f.txt", "x").is_err());
    }

    #[test]
    fn empty_editor_is_an_error() {
        assert!(edit_text("", "f.txt", "x").is_err());
    }
}
