//! Typed model of a CI workflow
//!
//! A workflow file is parsed into [`WorkflowConfig`], matched against an
//! [`Event`] to produce a [`Plan`] of job instances, and checked with
//! [`lint`].

pub mod config;
pub mod lint;
pub mod plan;
pub mod platform;
pub mod step;
pub mod trigger;

pub use config::{JobConfig, StepConfig, StrategyConfig, WorkflowConfig};
pub use lint::{lint, LintIssue, LintRule};
pub use plan::{plan, JobInstance, Plan, PlannedStep};
pub use platform::Os;
pub use step::StepKind;
pub use trigger::{Event, PushFilter, ReleaseAction, ReleaseFilter, Triggers};

/// Where the repository keeps its CI workflow
pub const DEFAULT_WORKFLOW_PATH: &str = ".github/workflows/ci.yml";
