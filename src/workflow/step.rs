//! Step classification
//!
//! Workflow steps are free-form; the handful of actions a Rust workflow uses
//! are recognised so they can be linted and run locally.

use crate::workflow::config::StepConfig;
use serde::{Deserialize, Serialize};

/// What a step does, as far as this crate understands it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepKind {
    /// Fetch the repository tree
    Checkout,

    /// Restore and persist build caches
    Cache { retain_on_failure: bool },

    /// Install a Rust toolchain
    Toolchain {
        channel: String,
        components: Vec<String>,
    },

    /// Invoke a cargo subcommand
    Cargo { command: String, args: Vec<String> },

    /// Arbitrary shell script
    Shell { script: String },

    /// An action this crate doesn't model
    Action { uses: String },
}

impl StepKind {
    /// Classify a step from its configuration
    pub fn classify(step: &StepConfig) -> Self {
        if let Some(run) = &step.run {
            return Self::from_script(run);
        }

        let uses = step.uses.clone().unwrap_or_default();
        let (action, reference) = match uses.split_once('@') {
            Some((action, reference)) => (action, Some(reference)),
            None => (uses.as_str(), None),
        };

        match action {
            "actions/checkout" => StepKind::Checkout,
            "Swatinem/rust-cache" | "actions/cache" => StepKind::Cache {
                retain_on_failure: step.input("cache-on-failure").as_deref() == Some("true"),
            },
            "actions-rs/toolchain" | "dtolnay/rust-toolchain" => StepKind::Toolchain {
                channel: step
                    .input("toolchain")
                    .or_else(|| {
                        reference
                            .filter(|r| !r.starts_with('v') && *r != "master")
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "stable".to_string()),
                components: step
                    .input("components")
                    .map(|c| split_list(&c))
                    .unwrap_or_default(),
            },
            "actions-rs/cargo" => StepKind::Cargo {
                command: step.input("command").unwrap_or_default(),
                args: step
                    .input("args")
                    .map(|a| a.split_whitespace().map(str::to_string).collect())
                    .unwrap_or_default(),
            },
            _ => StepKind::Action { uses },
        }
    }

    fn from_script(script: &str) -> Self {
        let trimmed = script.trim();
        if !trimmed.contains('\n') {
            let mut words = trimmed.split_whitespace();
            if words.next() == Some("cargo") {
                if let Some(command) = words.next() {
                    return StepKind::Cargo {
                        command: command.to_string(),
                        args: words.map(str::to_string).collect(),
                    };
                }
            }
        }
        StepKind::Shell {
            script: script.to_string(),
        }
    }

    /// The cargo subcommand, if this step runs one
    pub fn cargo_command(&self) -> Option<&str> {
        match self {
            StepKind::Cargo { command, .. } => Some(command),
            _ => None,
        }
    }

    /// Whether this step runs `cargo <command>` with `flag` among its args
    pub fn cargo_has_arg(&self, flag: &str) -> bool {
        match self {
            StepKind::Cargo { args, .. } => args.iter().any(|a| a == flag),
            _ => false,
        }
    }

    /// A short label for display
    pub fn describe(&self) -> String {
        match self {
            StepKind::Checkout => "checkout".to_string(),
            StepKind::Cache { .. } => "cache".to_string(),
            StepKind::Toolchain { channel, .. } => format!("toolchain {}", channel),
            StepKind::Cargo { command, args } if args.is_empty() => format!("cargo {}", command),
            StepKind::Cargo { command, args } => format!("cargo {} {}", command, args.join(" ")),
            StepKind::Shell { script } => script.lines().next().unwrap_or_default().to_string(),
            StepKind::Action { uses } => uses.clone(),
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_yaml::Value;

    fn uses(action: &str, with: &[(&str, Value)]) -> StepConfig {
        StepConfig {
            uses: Some(action.to_string()),
            with: with
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            ..Default::default()
        }
    }

    fn run(script: &str) -> StepConfig {
        StepConfig {
            run: Some(script.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_checkout() {
        let kind = StepKind::classify(&uses("actions/checkout@v4", &[]));
        assert_eq!(kind, StepKind::Checkout);
    }

    #[test]
    fn test_cache_on_failure() {
        let kind = StepKind::classify(&uses(
            "Swatinem/rust-cache@v2",
            &[("cache-on-failure", Value::Bool(true))],
        ));
        assert_eq!(
            kind,
            StepKind::Cache {
                retain_on_failure: true,
            }
        );

        let kind = StepKind::classify(&uses("Swatinem/rust-cache@v2", &[]));
        assert_eq!(
            kind,
            StepKind::Cache {
                retain_on_failure: false,
            }
        );
    }

    #[test]
    fn test_toolchain_inputs() {
        let kind = StepKind::classify(&uses(
            "actions-rs/toolchain@v1",
            &[
                ("toolchain", Value::String("stable".into())),
                ("components", Value::String("rustfmt, clippy".into())),
            ],
        ));
        assert_eq!(
            kind,
            StepKind::Toolchain {
                channel: "stable".to_string(),
                components: vec!["rustfmt".to_string(), "clippy".to_string()],
            }
        );
    }

    #[test]
    fn test_toolchain_channel_from_reference() {
        let kind = StepKind::classify(&uses("dtolnay/rust-toolchain@nightly", &[]));
        match kind {
            StepKind::Toolchain { channel, .. } => assert_eq!(channel, "nightly"),
            other => panic!("expected toolchain, got {:?}", other),
        }
    }

    #[test]
    fn test_cargo_action() {
        let kind = StepKind::classify(&uses(
            "actions-rs/cargo@v1",
            &[
                ("command", Value::String("fmt".into())),
                ("args", Value::String("--all -- --check".into())),
            ],
        ));
        assert_eq!(kind.cargo_command(), Some("fmt"));
        assert!(kind.cargo_has_arg("--check"));
        assert_eq!(kind.describe(), "cargo fmt --all -- --check");
    }

    #[test]
    fn test_cargo_run_line() {
        let kind = StepKind::classify(&run("cargo test --all-features"));
        assert_eq!(
            kind,
            StepKind::Cargo {
                command: "test".to_string(),
                args: vec!["--all-features".to_string()],
            }
        );
    }

    #[test]
    fn test_multiline_script_is_shell() {
        let kind = StepKind::classify(&run("cargo build\ncargo test\n"));
        assert!(matches!(kind, StepKind::Shell { .. }));
        assert_eq!(kind.describe(), "cargo build");
    }

    #[test]
    fn test_unknown_action() {
        let kind = StepKind::classify(&uses("codecov/codecov-action@v3", &[]));
        assert_eq!(
            kind,
            StepKind::Action {
                uses: "codecov/codecov-action@v3".to_string(),
            }
        );
    }
}
