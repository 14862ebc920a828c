//! Building the shell command that writes edited text back to the remote file.

/// Program used for the write command; also its leading token.
pub const WRITE_PROGRAM: &str = "printf";

/// Normalize line terminators to `\n` and drop one trailing empty line.
///
/// The write command appends the final newline itself.
pub fn normalize_text(text: &str) -> String {
    let mut normalized = text.replace("\r\n", "\n").replace('\r', "\n");
    if normalized.ends_with('\n') {
        normalized.pop();
    }
    normalized
}

/// Quote `raw` as a single shell word.
///
/// Words made only of safe characters pass through so `~/` keeps expanding.
pub fn shell_quote(raw: &str) -> String {
    let safe = !raw.is_empty()
        && raw
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "_-./~+@%:,=".contains(c));
    if safe && !raw.starts_with('=') {
        return raw.to_string();
    }
    format!("'{}'", raw.replace('\'', r"'\''"))
}

/// Build `printf '%s\n' '<text>' > <file>` for the edited text.
pub fn write_command(text: &str, filename: &str) -> String {
    format!(
        "{WRITE_PROGRAM} '%s\\n' {} > {}",
        shell_quote_always(&normalize_text(text)),
        shell_quote(filename)
    )
}

fn shell_quote_always(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_newline_is_dropped_once() {
        assert_eq!(normalize_text("a\nb\n"), "a\nb");
        assert_eq!(normalize_text("a\nb\n\n"), "a\nb\n");
        assert_eq!(normalize_text("a\nb"), "a\nb");
    }

    #[test]
    fn line_terminators_are_unified() {
        assert_eq!(normalize_text("a\r\nb\rc\r\n"), "a\nb\nc");
    }

    #[test]
    fn write_command_has_no_trailing_blank_line() {
        let command = write_command("a\nb\n", "f.txt");
        assert_eq!(command, "printf '%s\\n' 'a\nb' > f.txt");
        assert!(command.starts_with(WRITE_PROGRAM));
    }

    #[test]
    fn single_quotes_are_escaped() {
        let command = write_command("it's", "f.txt");
        assert_eq!(command, r"printf '%s\n' 'it'\''s' > f.txt");
    }

    #[test]
    fn filenames_are_quoted_when_needed() {
        assert_eq!(shell_quote("~/notes.md"), "~/notes.md");
        assert_eq!(shell_quote("/etc/hosts"), "/etc/hosts");
        assert_eq!(shell_quote("my file.txt"), "'my file.txt'");
        assert_eq!(shell_quote("$(rm -rf /)"), "'$(rm -rf /)'");
        assert_eq!(shell_quote(""), "''");
    }
}
