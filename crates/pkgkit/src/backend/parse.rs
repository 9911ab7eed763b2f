//! Parsers for pacman-style command output.
//!
//! `pacman` and `yay` share output formats for the query, search and info
//! verbs, so both adapters use these helpers.

use crate::types::{InstalledSnapshot, RawResult};
use std::collections::BTreeMap;

/// Parse `-Q` output (`name version` per line).
pub fn parse_query(stdout: &str) -> InstalledSnapshot {
    stdout
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next()) {
                (Some(name), Some(version)) => Some((name.to_string(), version.to_string())),
                _ => None,
            }
        })
        .collect()
}

/// Parse `-Ss` output into package names.
///
/// Result lines look like `extra/vim 9.1.0-1 (group)`; description lines
/// are indented and skipped.
pub fn parse_search(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter(|line| !line.starts_with(' ') && line.contains('/'))
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|qualified| qualified.split_once('/'))
        .map(|(_, name)| name.to_string())
        .collect()
}

/// Parse `-Si` output (`Key : Value` per line).
///
/// Splits at the first colon, so values containing colons (URLs) survive.
pub fn parse_info(stdout: &str) -> BTreeMap<String, String> {
    stdout
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
        .filter(|(key, _)| !key.is_empty())
        .collect()
}

/// Whether a failed query only means "no such package".
pub fn is_not_found(raw: &RawResult) -> bool {
    let stderr = raw.stderr.to_lowercase();
    stderr.contains("was not found") || stderr.contains("target not found")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let stdout = "git 2.45.1-1\nvim 9.1.0411-1\n\nbroken-line\n";
        let snapshot = parse_query(stdout);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["git"], "2.45.1-1");
        assert_eq!(snapshot["vim"], "9.1.0411-1");
        assert!(!snapshot.contains_key("broken-line"));
    }

    #[test]
    fn test_parse_search() {
        let stdout = "\
extra/vim 9.1.0411-1 [installed]
    Vi Improved, a highly configurable, improved version of the vi text editor
aur/vim-plug 0.14.0-1 (+120 2.10)
    Minimalist Vim Plugin Manager
";
        assert_eq!(parse_search(stdout), vec!["vim", "vim-plug"]);
    }

    #[test]
    fn test_parse_info() {
        let stdout = "\
Repository      : extra
Name            : htop
Version         : 3.3.0-3
URL             : https://htop.dev/
";
        let info = parse_info(stdout);
        assert_eq!(info["Name"], "htop");
        assert_eq!(info["Version"], "3.3.0-3");
        assert_eq!(info["URL"], "https://htop.dev/");
    }

    #[test]
    fn test_is_not_found() {
        let raw = RawResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "error: package 'bogus' was not found".to_string(),
        };
        assert!(is_not_found(&raw));

        let broken = RawResult {
            exit_code: 1,
            stdout: String::new(),
            stderr: "error: could not open database".to_string(),
        };
        assert!(!is_not_found(&broken));
    }
}
