//! CLI command definitions

use crate::workflow::Event;
use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Open a path or URI
#[derive(Debug, Args, Clone)]
pub struct OpenCommand {
    /// Path or URI to open
    pub target: String,

    /// Use the browser named by $BROWSER
    #[arg(long, conflicts_with = "editor")]
    pub browser: bool,

    /// Use the editor named by $EDITOR
    #[arg(long)]
    pub editor: bool,

    /// Print the command instead of running it
    #[arg(long)]
    pub dry_run: bool,
}

/// CI workflow commands
#[derive(Debug, Subcommand, Clone)]
pub enum CiCommand {
    /// Validate a workflow file
    Validate(ValidateCommand),

    /// Check a workflow against the CI rules
    Lint(LintCommand),

    /// Show the job instances an event schedules
    Plan(PlanCommand),

    /// Run the scheduled instances locally
    Run(RunCommand),
}

/// Workflow file selection
#[derive(Debug, Args, Clone)]
pub struct WorkflowArgs {
    /// Path to workflow YAML file (defaults to the settings value)
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Event selection
#[derive(Debug, Args, Clone)]
pub struct EventArgs {
    /// Event to simulate
    #[arg(long, value_enum, default_value_t = EventArg::Push)]
    pub event: EventArg,

    /// Branch pushed to
    #[arg(long)]
    pub branch: Option<String>,

    /// Release activity type
    #[arg(long)]
    pub action: Option<String>,
}

impl EventArgs {
    /// Build the event these arguments describe
    pub fn to_event(&self) -> anyhow::Result<Event> {
        match self.event {
            EventArg::Push => {
                if self.action.is_some() {
                    anyhow::bail!("--action only applies to release events");
                }
                Event::parse("push", self.branch.as_deref())
            }
            EventArg::Release => {
                if self.branch.is_some() {
                    anyhow::bail!("--branch only applies to push events");
                }
                Event::parse("release", self.action.as_deref())
            }
        }
    }
}

/// Event argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum EventArg {
    Push,
    Release,
}

/// Validate a workflow configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Lint a workflow configuration
#[derive(Debug, Args, Clone)]
pub struct LintCommand {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Plan a workflow run
#[derive(Debug, Args, Clone)]
pub struct PlanCommand {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    #[command(flatten)]
    pub event: EventArgs,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Run a workflow locally
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    #[command(flatten)]
    pub workflow: WorkflowArgs,

    #[command(flatten)]
    pub event: EventArgs,

    /// Also run instances meant for other platforms
    #[arg(long)]
    pub all_platforms: bool,

    /// Tree to run the steps in (defaults to the current directory)
    #[arg(long)]
    pub working_dir: Option<PathBuf>,

    /// Timeout per step in seconds (overrides settings)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
