//! Default system handlers per platform

use crate::opener::{PathOrUri, Result};
use serde::{Deserialize, Serialize};
use std::process::Command;

/// The program the operating system uses to open files and URIs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SystemHandler {
    /// `xdg-open`, used on everything that isn't Windows or macOS
    XdgOpen,
    /// macOS `open`
    MacOpen,
    /// `cmd /c start` on Windows
    WindowsStart,
}

impl SystemHandler {
    /// The handler for the platform this crate was compiled for
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            SystemHandler::WindowsStart
        } else if cfg!(target_os = "macos") {
            SystemHandler::MacOpen
        } else {
            SystemHandler::XdgOpen
        }
    }

    /// The executable that must exist for this handler to work
    pub fn program(&self) -> &'static str {
        match self {
            SystemHandler::XdgOpen => "xdg-open",
            SystemHandler::MacOpen => "open",
            SystemHandler::WindowsStart => "cmd",
        }
    }

    /// Build the command for `target` without checking that the program exists
    pub(crate) fn command(&self, target: &PathOrUri) -> Result {
        let mut cmd = Command::new(self.program());
        match self {
            SystemHandler::XdgOpen | SystemHandler::MacOpen => {
                cmd.arg(target.to_string());
            }
            SystemHandler::WindowsStart => {
                // Paths are passed as file URIs so they can't be mistaken for `/flags`.
                // The empty argument is the window title `start` expects first.
                let uri = target.uri()?;
                cmd.args(["/c", "start", ""]).arg(escape_cmd(uri.as_str()));
            }
        }
        Ok(cmd)
    }
}

/// Caret-escape characters `cmd.exe` would otherwise interpret
///
/// `%` has no escape; a following `^` keeps `%NAME%` from expanding and cmd
/// strips the caret afterwards.
fn escape_cmd(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '^' | '&' | '|' | '<' | '>' | '(' | ')' => {
                escaped.push('^');
                escaped.push(c);
            }
            '%' => escaped.push_str("%^"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(cmd: &Command) -> Vec<String> {
        cmd.get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_xdg_open_passes_target_verbatim() {
        let target = PathOrUri::from("https://example.com/?a=1&b=2");
        let cmd = SystemHandler::XdgOpen.command(&target).unwrap();
        assert_eq!(cmd.get_program(), "xdg-open");
        assert_eq!(args(&cmd), vec!["https://example.com/?a=1&b=2"]);
    }

    #[test]
    fn test_mac_open_keeps_relative_paths() {
        let target = PathOrUri::from("docs/index.html");
        let cmd = SystemHandler::MacOpen.command(&target).unwrap();
        assert_eq!(cmd.get_program(), "open");
        assert_eq!(args(&cmd), vec!["docs/index.html"]);
    }

    #[test]
    fn test_windows_start_uses_title_and_escapes() {
        let target = PathOrUri::from("https://example.com/?a=1&b=2");
        let cmd = SystemHandler::WindowsStart.command(&target).unwrap();
        assert_eq!(cmd.get_program(), "cmd");
        assert_eq!(
            args(&cmd),
            vec!["/c", "start", "", "https://example.com/?a=1^&b=2"]
        );
    }

    #[test]
    fn test_windows_start_converts_paths_to_file_uris() {
        let target = PathOrUri::from("notes.txt");
        let cmd = SystemHandler::WindowsStart.command(&target).unwrap();
        let last = args(&cmd).pop().unwrap();
        assert!(last.starts_with("file:///"), "got {}", last);
        assert!(last.ends_with("/notes.txt"));
    }

    #[test]
    fn test_current_matches_target_os() {
        let handler = SystemHandler::current();
        if cfg!(target_os = "windows") {
            assert_eq!(handler, SystemHandler::WindowsStart);
        } else if cfg!(target_os = "macos") {
            assert_eq!(handler, SystemHandler::MacOpen);
        } else {
            assert_eq!(handler, SystemHandler::XdgOpen);
        }
    }

    #[test]
    fn test_escape_cmd() {
        assert_eq!(escape_cmd("a&b|c"), "a^&b^|c");
        assert_eq!(escape_cmd("plain"), "plain");
    }

    #[test]
    fn test_escape_cmd_breaks_variable_expansion() {
        assert_eq!(escape_cmd("?q=%PATH%"), "?q=%^PATH%^");
        assert_eq!(escape_cmd("a%20b"), "a%^20b");
    }
}
