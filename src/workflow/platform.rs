//! Runner operating systems

use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating system of a job runner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    MacOs,
    Windows,
}

impl Os {
    pub const ALL: [Os; 3] = [Os::Linux, Os::MacOs, Os::Windows];

    /// The operating system this binary runs on
    pub fn current() -> Self {
        if cfg!(target_os = "windows") {
            Os::Windows
        } else if cfg!(target_os = "macos") {
            Os::MacOs
        } else {
            Os::Linux
        }
    }

    /// Derive the OS from a hosted runner label such as `ubuntu-latest`
    pub fn from_runner_label(label: &str) -> Option<Self> {
        let label = label.trim().to_ascii_lowercase();
        if label.starts_with("ubuntu") || label.starts_with("linux") {
            Some(Os::Linux)
        } else if label.starts_with("macos") {
            Some(Os::MacOs)
        } else if label.starts_with("windows") {
            Some(Os::Windows)
        } else {
            None
        }
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Os::Linux => write!(f, "Linux"),
            Os::MacOs => write!(f, "macOS"),
            Os::Windows => write!(f, "Windows"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runner_labels() {
        assert_eq!(Os::from_runner_label("ubuntu-latest"), Some(Os::Linux));
        assert_eq!(Os::from_runner_label("ubuntu-22.04"), Some(Os::Linux));
        assert_eq!(Os::from_runner_label("macos-14"), Some(Os::MacOs));
        assert_eq!(Os::from_runner_label("Windows-2022"), Some(Os::Windows));
        assert_eq!(Os::from_runner_label("self-hosted"), None);
    }
}
