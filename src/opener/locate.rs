//! Executable lookup

use std::path::PathBuf;

/// Finds executables before a command is handed out
pub trait Locate: Send + Sync {
    /// Resolve `program` to the executable that would run
    fn locate(&self, program: &str) -> Result<PathBuf, which::Error>;
}

/// Locator backed by `PATH` lookup through the `which` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct WhichLocator;

impl Locate for WhichLocator {
    fn locate(&self, program: &str) -> Result<PathBuf, which::Error> {
        which::which(program)
    }
}
