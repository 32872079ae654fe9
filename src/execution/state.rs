//! Execution state models

use crate::workflow::JobInstance;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of one job instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Scheduled but not started
    Pending,
    /// Steps are running
    Running,
    /// Every step succeeded
    Success,
    /// A step failed
    Failure,
    /// Not run on this host
    Skipped,
}

impl JobStatus {
    /// Check if the instance is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failure | JobStatus::Skipped
        )
    }
}

/// Status of one step within an instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Pending,
    Succeeded,
    Failed,
    /// Not run because an earlier step failed or the instance was skipped
    Skipped,
}

/// Result of one step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub name: String,
    pub status: StepStatus,

    /// Combined stdout and stderr
    #[serde(default)]
    pub output: String,

    #[serde(default)]
    pub exit_code: Option<i32>,

    /// Why the step could not run at all
    #[serde(default)]
    pub error: Option<String>,
}

impl StepReport {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: StepStatus::Pending,
            output: String::new(),
            exit_code: None,
            error: None,
        }
    }
}

/// Result of one job instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceReport {
    pub job_id: String,
    pub name: String,
    pub runs_on: String,
    pub status: JobStatus,
    pub steps: Vec<StepReport>,

    /// Why the instance was skipped
    #[serde(default)]
    pub skip_reason: Option<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl InstanceReport {
    /// A pending report with one pending entry per step
    pub fn pending(instance: &JobInstance) -> Self {
        Self {
            job_id: instance.job_id.clone(),
            name: instance.name.clone(),
            runs_on: instance.runs_on.clone(),
            status: JobStatus::Pending,
            steps: instance
                .steps
                .iter()
                .map(|s| StepReport::pending(s.name.clone()))
                .collect(),
            skip_reason: None,
            started_at: None,
            finished_at: None,
        }
    }

    /// Mark the instance as running
    pub fn start(&mut self) {
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the instance finished; it fails if any step failed
    pub fn finish(&mut self) {
        self.status = match self.failed_step() {
            Some(_) => JobStatus::Failure,
            None => JobStatus::Success,
        };
        self.finished_at = Some(Utc::now());
    }

    /// Mark the instance and all its steps as skipped
    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = JobStatus::Skipped;
        self.skip_reason = Some(reason.into());
        for step in &mut self.steps {
            step.status = StepStatus::Skipped;
        }
    }

    /// The first failed step, if any
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.status == StepStatus::Failed)
    }
}

/// Result of a local run of a plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run ID
    pub run_id: Uuid,

    /// Event the plan was built for
    pub event: String,

    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,

    /// One entry per planned instance, in plan order
    pub instances: Vec<InstanceReport>,
}

impl RunReport {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            event: event.into(),
            started_at: Utc::now(),
            finished_at: None,
            instances: Vec::new(),
        }
    }

    /// Whether no instance failed
    pub fn succeeded(&self) -> bool {
        self.count(JobStatus::Failure) == 0
    }

    pub fn count(&self, status: JobStatus) -> usize {
        self.instances.iter().filter(|i| i.status == status).count()
    }

    /// Reports for one job
    pub fn instances_of<'a>(
        &'a self,
        job_id: &'a str,
    ) -> impl Iterator<Item = &'a InstanceReport> + 'a {
        self.instances.iter().filter(move |i| i.job_id == job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(steps: &[StepStatus]) -> InstanceReport {
        InstanceReport {
            job_id: "job".to_string(),
            name: "job".to_string(),
            runs_on: "ubuntu-latest".to_string(),
            status: JobStatus::Pending,
            steps: steps
                .iter()
                .enumerate()
                .map(|(i, status)| StepReport {
                    status: *status,
                    ..StepReport::pending(format!("step{}", i))
                })
                .collect(),
            skip_reason: None,
            started_at: None,
            finished_at: None,
        }
    }

    #[test]
    fn test_job_status_is_terminal() {
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Success.is_terminal());
        assert!(JobStatus::Failure.is_terminal());
        assert!(JobStatus::Skipped.is_terminal());
    }

    #[test]
    fn test_finish_derives_status() {
        let mut ok = report(&[StepStatus::Succeeded, StepStatus::Succeeded]);
        ok.start();
        ok.finish();
        assert_eq!(ok.status, JobStatus::Success);
        assert!(ok.finished_at.is_some());

        let mut bad = report(&[StepStatus::Failed, StepStatus::Skipped]);
        bad.finish();
        assert_eq!(bad.status, JobStatus::Failure);
        assert_eq!(bad.failed_step().unwrap().name, "step0");
    }

    #[test]
    fn test_skip_marks_steps() {
        let mut r = report(&[StepStatus::Pending, StepStatus::Pending]);
        r.skip("other platform");
        assert_eq!(r.status, JobStatus::Skipped);
        assert!(r.steps.iter().all(|s| s.status == StepStatus::Skipped));
    }

    #[test]
    fn test_run_report_success_ignores_skips() {
        let mut run = RunReport::new("push to main");
        let mut skipped = report(&[StepStatus::Pending]);
        skipped.skip("other platform");
        let mut ok = report(&[StepStatus::Succeeded]);
        ok.finish();
        run.instances = vec![skipped, ok];
        assert!(run.succeeded());
        assert_eq!(run.count(JobStatus::Skipped), 1);

        let mut bad = report(&[StepStatus::Failed]);
        bad.finish();
        run.instances.push(bad);
        assert!(!run.succeeded());
    }
}
