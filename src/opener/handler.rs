//! Handlers named by environment variables such as `$BROWSER`
//!
//! A value is a list of candidates separated like `PATH` entries. Each
//! candidate is a program followed by whitespace-separated arguments; an
//! argument containing `%s` receives the target, otherwise the target is
//! appended.

use crate::opener::PathOrUri;
use std::process::Command;

#[cfg(windows)]
const LIST_SEPARATOR: char = ';';
#[cfg(not(windows))]
const LIST_SEPARATOR: char = ':';

const TARGET_PLACEHOLDER: &str = "%s";

/// One candidate from an environment handler list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerCommand {
    /// Program to run
    pub program: String,
    /// Arguments, possibly containing the `%s` placeholder
    pub args: Vec<String>,
}

impl HandlerCommand {
    /// Build the command that opens `target` with this handler
    pub fn command(&self, target: &PathOrUri) -> Command {
        let target = target.to_string();
        let mut cmd = Command::new(&self.program);

        let mut substituted = false;
        for arg in &self.args {
            if arg.contains(TARGET_PLACEHOLDER) {
                cmd.arg(arg.replace(TARGET_PLACEHOLDER, &target));
                substituted = true;
            } else {
                cmd.arg(arg);
            }
        }
        if !substituted {
            cmd.arg(target);
        }
        cmd
    }
}

/// Split an environment handler value into its candidates, in order
pub fn parse_handlers(value: &str) -> Vec<HandlerCommand> {
    value
        .split(LIST_SEPARATOR)
        .filter_map(|entry| {
            let mut words = entry.split_whitespace().map(str::to_string);
            let program = words.next()?;
            Some(HandlerCommand {
                program,
                args: words.collect(),
            })
        })
        .collect()
}
