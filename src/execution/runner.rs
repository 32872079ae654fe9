//! Step runners - how one planned step is carried out

use crate::workflow::{JobInstance, PlannedStep, StepKind};
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Error types for step runners
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timeout after {0} seconds")]
    Timeout(u64),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Outcome of a step that ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub success: bool,
    pub output: String,
    pub exit_code: Option<i32>,
}

impl StepOutcome {
    /// A step satisfied without running anything
    pub fn satisfied(note: impl Into<String>) -> Self {
        Self {
            success: true,
            output: note.into(),
            exit_code: None,
        }
    }
}

/// Trait for step execution - allows for different implementations
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Run one step of `instance`
    async fn run(
        &self,
        instance: &JobInstance,
        step: &PlannedStep,
    ) -> Result<StepOutcome, RunnerError>;
}

/// Runs cargo and shell steps as subprocesses in a working tree
#[derive(Debug, Clone)]
pub struct CommandStepRunner {
    /// Tree the commands run in
    working_dir: PathBuf,

    /// Path to the cargo executable
    cargo: String,

    /// Timeout per step in seconds
    timeout_secs: u64,
}

impl CommandStepRunner {
    /// Create a runner for `working_dir`; cargo is taken from `PATH`
    pub fn new(working_dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            working_dir: working_dir.into(),
            cargo: "cargo".to_string(),
            timeout_secs,
        }
    }

    pub fn with_cargo(mut self, cargo: impl Into<String>) -> Self {
        self.cargo = cargo.into();
        self
    }

    pub fn working_dir(&self) -> &std::path::Path {
        &self.working_dir
    }

    /// Build the subprocess for a step, or `None` if it needs no process
    fn command_for(&self, kind: &StepKind) -> Option<(String, Command)> {
        match kind {
            StepKind::Cargo { command, args } => {
                let mut cmd = Command::new(&self.cargo);
                cmd.arg(command).args(args);
                Some((format!("{} {}", self.cargo, command), cmd))
            }
            StepKind::Shell { script } => {
                let mut cmd = if cfg!(windows) {
                    let mut cmd = Command::new("cmd");
                    cmd.arg("/C");
                    cmd
                } else {
                    let mut cmd = Command::new("sh");
                    cmd.arg("-c");
                    cmd
                };
                cmd.arg(script);
                Some((kind.describe(), cmd))
            }
            _ => None,
        }
    }

    async fn spawn(&self, program: String, mut cmd: Command) -> Result<StepOutcome, RunnerError> {
        debug!("running {} in {}", program, self.working_dir.display());

        cmd.current_dir(&self.working_dir).kill_on_drop(true);
        let limit = Duration::from_secs(self.timeout_secs);
        let result = timeout(limit, cmd.output())
            .await
            .map_err(|_| RunnerError::Timeout(self.timeout_secs))?;

        let output = result.map_err(|source| RunnerError::Spawn {
            program: program.clone(),
            source,
        })?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            warn!(
                "{} exited with code {}",
                program,
                output.status.code().unwrap_or(-1)
            );
        }

        Ok(StepOutcome {
            success: output.status.success(),
            output: text,
            exit_code: output.status.code(),
        })
    }
}

#[async_trait]
impl StepRunner for CommandStepRunner {
    async fn run(
        &self,
        instance: &JobInstance,
        step: &PlannedStep,
    ) -> Result<StepOutcome, RunnerError> {
        debug!("{}: {}", instance.name, step.name);

        match &step.kind {
            StepKind::Checkout => Ok(StepOutcome::satisfied("using the local working tree")),
            StepKind::Cache { .. } => Ok(StepOutcome::satisfied("cache is not used locally")),
            StepKind::Toolchain { channel, .. } => {
                let note = format!("using the installed toolchain, not {}", channel);
                Ok(StepOutcome::satisfied(note))
            }
            StepKind::Action { uses } => {
                warn!("action {} is not supported locally, skipping", uses);
                let note = format!("{} is not supported locally", uses);
                Ok(StepOutcome::satisfied(note))
            }
            kind => {
                let Some((program, cmd)) = self.command_for(kind) else {
                    let message = format!("no command for step '{}'", step.name);
                    return Err(RunnerError::Internal(message));
                };
                self.spawn(program, cmd).await
            }
        }
    }
}
