//! Local execution of workflow plans

pub mod engine;
pub mod runner;
pub mod state;

pub use engine::{EventHandler, LocalExecutor, RunEvent};
pub use runner::{CommandStepRunner, RunnerError, StepOutcome, StepRunner};
pub use state::{InstanceReport, JobStatus, RunReport, StepReport, StepStatus};
