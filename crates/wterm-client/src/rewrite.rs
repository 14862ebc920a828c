//! Command-line rewriting applied on Enter.
//!
//! - `vi <file>` / `vim <file>` become `cat <file>` and arm a capture, so the
//!   file content can be edited locally instead of in a remote full-screen editor.
//! - Known program names are replaced through an alias table (`apt` → `apt-get`).

use std::sync::OnceLock;

use regex::Regex;

/// Program that replaces `vi`/`vim` to read the file.
pub const READ_PROGRAM: &str = "cat";

fn editor_invocation() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(vi|vim)\s+(\S+)").expect("static pattern"))
}

/// Program-name aliases, matched on the first token of the command.
#[derive(Debug, Clone)]
pub struct AliasTable {
    /// Sorted longest program name first.
    entries: Vec<(String, String)>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::from_pairs([("apt", "apt-get")])
    }
}

impl AliasTable {
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut entries: Vec<(String, String)> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, _)| !k.is_empty())
            .collect();
        entries.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        Self { entries }
    }

    /// Rewrite `command` if it starts with an aliased program name.
    ///
    /// The name must be the whole first token: `apt install` matches `apt`,
    /// `apt-get install` and `aptitude` do not.
    pub fn rewrite(&self, command: &str) -> Option<String> {
        self.entries.iter().find_map(|(from, to)| {
            let rest = command.strip_prefix(from.as_str())?;
            if rest.is_empty() || rest.starts_with(char::is_whitespace) {
                Some(format!("{to}{rest}"))
            } else {
                None
            }
        })
    }
}

/// Result of rewriting a submitted line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewritten {
    /// The command to send (without the trailing carriage return).
    pub command: String,
    /// File to capture for editing, when the line was an editor invocation.
    pub edit_target: Option<String>,
}

/// Applies the editor rewrite and the alias table to submitted lines.
#[derive(Debug, Clone, Default)]
pub struct CommandRewriter {
    aliases: AliasTable,
}

impl CommandRewriter {
    pub fn new(aliases: AliasTable) -> Self {
        Self { aliases }
    }

    pub fn aliases(&self) -> &AliasTable {
        &self.aliases
    }

    /// Rewrite a raw input line. Leading whitespace is dropped first.
    pub fn rewrite(&self, line: &str) -> Rewritten {
        let line = line.trim_start();

        let (command, edit_target) = match editor_invocation().captures(line) {
            Some(caps) => {
                let program_len = caps.get(1).map_or(0, |m| m.end());
                let target = caps.get(2).map(|m| m.as_str().to_string());
                (format!("{READ_PROGRAM}{}", &line[program_len..]), target)
            }
            None => (line.to_string(), None),
        };

        let command = self.aliases.rewrite(&command).unwrap_or(command);
        Rewritten {
            command,
            edit_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vi_and_vim_rewrite_identically() {
        let rewriter = CommandRewriter::default();
        let vi = rewriter.rewrite("vi foo.txt");
        let vim = rewriter.rewrite("vim foo.txt");
        assert_eq!(vi, vim);
        assert_eq!(vi.command, "cat foo.txt");
        assert_eq!(vi.edit_target.as_deref(), Some("foo.txt"));
    }

    #[test]
    fn leading_whitespace_is_trimmed() {
        let rewritten = CommandRewriter::default().rewrite("   vim /etc/hosts");
        assert_eq!(rewritten.command, "cat /etc/hosts");
        assert_eq!(rewritten.edit_target.as_deref(), Some("/etc/hosts"));
    }

    #[test]
    fn filename_is_first_token_only() {
        let rewritten = CommandRewriter::default().rewrite("vi a.txt b.txt");
        assert_eq!(rewritten.command, "cat a.txt b.txt");
        assert_eq!(rewritten.edit_target.as_deref(), Some("a.txt"));
    }

    #[test]
    fn bare_or_lookalike_editor_is_untouched() {
        let rewriter = CommandRewriter::default();
        for line in ["vi", "vim", "view foo.txt", "vimdiff a b", "echo vi foo"] {
            let rewritten = rewriter.rewrite(line);
            assert_eq!(rewritten.command, line);
            assert_eq!(rewritten.edit_target, None);
        }
    }

    #[test]
    fn apt_becomes_apt_get() {
        let rewritten = CommandRewriter::default().rewrite("apt install x");
        assert_eq!(rewritten.command, "apt-get install x");
        assert_eq!(rewritten.edit_target, None);
    }

    #[test]
    fn apt_substring_elsewhere_is_untouched() {
        let rewriter = CommandRewriter::default();
        for line in ["echo apt", "apt-get install x", "aptitude search x", "ls /var/cache/apt"] {
            assert_eq!(rewriter.rewrite(line).command, line);
        }
    }

    #[test]
    fn longest_alias_wins() {
        let table = AliasTable::from_pairs([("g", "git"), ("gs", "git status")]);
        assert_eq!(table.rewrite("gs").as_deref(), Some("git status"));
        assert_eq!(table.rewrite("g log").as_deref(), Some("git log"));
        assert_eq!(table.rewrite("grep x"), None);
    }
}
