//! open-command - generate commands for opening paths and URIs in the
//! default system handler, plus the tooling that checks this repository's CI
//! workflow.

#[cfg(feature = "cli")]
pub mod cli;
pub mod execution;
pub mod opener;
pub mod settings;
pub mod workflow;

// Re-export commonly used types
pub use execution::{CommandStepRunner, LocalExecutor, RunReport, StepRunner};
pub use opener::{open, open_browser, open_editor, Error, Opener, OpenerConfig, PathOrUri, Result};
pub use opener::{SystemHandler, BROWSER_ENV, EDITOR_ENV};
pub use settings::Settings;
pub use workflow::{lint, plan, Event, Plan, WorkflowConfig};
