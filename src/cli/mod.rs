//! Command-line interface

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};
use commands::{CiCommand, OpenCommand};
use std::ffi::OsString;
use std::path::PathBuf;

/// Open paths and URIs, and check the CI workflow
#[derive(Debug, Parser, Clone)]
#[command(name = "open-command")]
#[command(version)]
#[command(about = "Open paths and URIs in the default handler")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to a settings file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Open a path or URI
    Open(OpenCommand),

    /// Inspect and run the CI workflow
    #[command(subcommand)]
    Ci(CiCommand),
}

impl Cli {
    /// Parse CLI arguments from environment
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Parse CLI arguments from a slice
    pub fn try_parse_from<I, T>(itr: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        <Self as Parser>::try_parse_from(itr)
    }
}

/// Where settings are read from when `--config` is not given
pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("open-command").join("config.yaml"))
}
