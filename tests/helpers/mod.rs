//! Test utilities shared by the workflow test suites
#![allow(dead_code)]

use async_trait::async_trait;
use open_command::execution::{
    InstanceReport, JobStatus, LocalExecutor, RunReport, RunnerError, StepOutcome, StepRunner,
    StepStatus,
};
use open_command::workflow::{JobInstance, Plan, PlannedStep, WorkflowConfig};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Path of this repository's own CI workflow
pub fn repo_workflow_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join(".github/workflows/ci.yml")
}

/// Load this repository's own CI workflow
pub fn repo_workflow() -> WorkflowConfig {
    WorkflowConfig::from_file(repo_workflow_path()).expect("repository workflow should load")
}

/// Mock step runner with scripted failures
///
/// Every step succeeds unless a failure was registered for its job and step
/// name. Calls are recorded as `(instance name, step name)` in order.
#[derive(Clone, Default)]
pub struct MockRunner {
    failures: Arc<Vec<(String, String)>>,
    errors: Arc<Vec<(String, String)>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    simulate_delay: Option<Duration>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `step` of every instance of `job_id` exit unsuccessfully
    pub fn with_failure(mut self, job_id: &str, step: &str) -> Self {
        Arc::make_mut(&mut self.failures).push((job_id.to_string(), step.to_string()));
        self
    }

    /// Make `step` of every instance of `job_id` fail to start
    pub fn with_error(mut self, job_id: &str, step: &str) -> Self {
        Arc::make_mut(&mut self.errors).push((job_id.to_string(), step.to_string()));
        self
    }

    /// Add artificial delay to every step
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.simulate_delay = Some(delay);
        self
    }

    /// Steps run so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }

    /// Steps run so far by one instance
    pub fn calls_for(&self, instance: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|(name, _)| name == instance)
            .map(|(_, step)| step)
            .collect()
    }

    fn scripted(list: &[(String, String)], instance: &JobInstance, step: &PlannedStep) -> bool {
        let call = (instance.job_id.clone(), step.name.clone());
        list.contains(&call)
    }
}

#[async_trait]
impl StepRunner for MockRunner {
    async fn run(
        &self,
        instance: &JobInstance,
        step: &PlannedStep,
    ) -> Result<StepOutcome, RunnerError> {
        if let Some(delay) = self.simulate_delay {
            tokio::time::sleep(delay).await;
        }

        self.calls
            .lock()
            .unwrap()
            .push((instance.name.clone(), step.name.clone()));

        if Self::scripted(&self.errors, instance, step) {
            let message = format!("MockRunner: {} could not start", step.name);
            return Err(RunnerError::Internal(message));
        }

        let success = !Self::scripted(&self.failures, instance, step);
        Ok(StepOutcome {
            success,
            output: format!("{}: {}", instance.name, step.name),
            exit_code: Some(if success { 0 } else { 1 }),
        })
    }
}

/// Run every instance of a plan with the mock runner, ignoring platforms
pub async fn run_plan_with_mock(plan: &Plan, runner: MockRunner) -> RunReport {
    LocalExecutor::new(runner)
        .with_all_platforms(true)
        .execute(plan)
        .await
}

/// Find an instance report by name
pub fn instance<'a>(report: &'a RunReport, name: &str) -> &'a InstanceReport {
    match report.instances.iter().find(|i| i.name == name) {
        Some(instance) => instance,
        None => panic!("no instance named '{}' in {:?}", name, names(report)),
    }
}

/// Instance names in plan order
pub fn names(report: &RunReport) -> Vec<String> {
    report.instances.iter().map(|i| i.name.clone()).collect()
}

/// Assert an instance finished with every step succeeding
pub fn assert_instance_succeeded(report: &RunReport, name: &str) {
    let instance = instance(report, name);
    assert_eq!(instance.status, JobStatus::Success, "{} failed", name);
    let all_succeeded = instance
        .steps
        .iter()
        .all(|s| s.status == StepStatus::Succeeded);
    assert!(
        all_succeeded,
        "{} has unsuccessful steps: {:?}",
        name, instance.steps
    );
}

/// Assert an instance failed at `step`, with everything after it skipped
pub fn assert_instance_failed_at(report: &RunReport, name: &str, step: &str) {
    let instance = instance(report, name);
    assert_eq!(instance.status, JobStatus::Failure, "{} passed", name);

    let failed_at = instance
        .steps
        .iter()
        .position(|s| s.status == StepStatus::Failed)
        .unwrap_or_else(|| panic!("{} has no failed step", name));
    assert_eq!(instance.steps[failed_at].name, step);
    assert!(instance.steps[..failed_at]
        .iter()
        .all(|s| s.status == StepStatus::Succeeded));
    assert!(instance.steps[failed_at + 1..]
        .iter()
        .all(|s| s.status == StepStatus::Skipped));
}
