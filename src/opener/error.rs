//! Opener error types

use std::path::PathBuf;
use std::process::Command;
use thiserror::Error;

/// Type alias for the most common results in this module.
pub type Result<T = Command, E = Error> = std::result::Result<T, E>;

/// Errors that may occur when generating a [`Command`].
#[derive(Debug, Error)]
pub enum Error {
    /// A file path could not be turned into a `file://` URI.
    ///
    /// Windows handlers always receive URIs, so paths that cannot be made
    /// absolute end up here. See [`crate::PathOrUri::uri`].
    #[error("could not convert file path to URI: {0:?}")]
    FileToUri(PathBuf),

    /// An I/O error occurred while setting up the command.
    #[error("I/O error occurred: {0}")]
    Io(#[from] std::io::Error),

    /// A required executable was not found.
    ///
    /// With the default handler on Unix-like systems this is `xdg-open`,
    /// which ships with `xdg-utils`.
    #[error("executable {exe} not found: {source}")]
    NotFound {
        /// The program that couldn't be found
        exe: String,
        /// The error returned by the locator
        #[source]
        source: which::Error,
    },

    /// An environment handler was set but names no program.
    #[error("environment variable {env} does not name a program")]
    EmptyHandler {
        /// The variable that was consulted
        env: String,
    },
}
