//! Local executor - runs every instance of a plan

use crate::execution::{
    InstanceReport, JobStatus, RunReport, StepOutcome, StepRunner, StepStatus,
};
use crate::workflow::{JobInstance, Os, Plan};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Events that can occur during a local run
#[derive(Debug, Clone)]
pub enum RunEvent {
    RunStarted {
        run_id: Uuid,
        event: String,
        instances: usize,
    },
    InstanceStarted {
        instance: String,
    },
    InstanceSkipped {
        instance: String,
        reason: String,
    },
    StepStarted {
        instance: String,
        step: String,
    },
    StepFinished {
        instance: String,
        step: String,
        status: StepStatus,
    },
    InstanceFinished {
        instance: String,
        status: JobStatus,
    },
    RunFinished {
        run_id: Uuid,
        succeeded: bool,
    },
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(RunEvent) + Send + Sync>;

#[derive(Clone, Default)]
struct Handlers(Arc<Mutex<Vec<EventHandler>>>);

impl Handlers {
    async fn emit(&self, event: RunEvent) {
        let handlers = self.0.lock().await;
        for handler in handlers.iter() {
            handler(event.clone());
        }
    }
}

/// Runs a plan on this machine
///
/// Instances run concurrently and never cancel each other, up to a job's
/// `max-parallel` at a time. Inside an instance the steps run in order and
/// the first failure skips the rest.
pub struct LocalExecutor<R> {
    runner: Arc<R>,
    host: Os,
    all_platforms: bool,
    handlers: Handlers,
}

impl<R: StepRunner + 'static> LocalExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner: Arc::new(runner),
            host: Os::current(),
            all_platforms: false,
            handlers: Handlers::default(),
        }
    }

    /// Pretend to run on `host`
    pub fn with_host(mut self, host: Os) -> Self {
        self.host = host;
        self
    }

    /// Run instances meant for other platforms on this host too
    pub fn with_all_platforms(mut self, all_platforms: bool) -> Self {
        self.all_platforms = all_platforms;
        self
    }

    /// Add an event handler
    pub async fn add_event_handler<F>(&self, handler: F)
    where
        F: Fn(RunEvent) + Send + Sync + 'static,
    {
        self.handlers.0.lock().await.push(Arc::new(handler));
    }

    /// Execute every instance of the plan
    pub async fn execute(&self, plan: &Plan) -> RunReport {
        let mut report = RunReport::new(plan.event.to_string());
        let run_id = report.run_id;

        info!("Starting local run {} for {}", run_id, plan.event);
        self.handlers
            .emit(RunEvent::RunStarted {
                run_id,
                event: plan.event.to_string(),
                instances: plan.len(),
            })
            .await;

        let mut slots: Vec<Option<InstanceReport>> = vec![None; plan.len()];
        let mut limits: HashMap<String, Arc<Semaphore>> = HashMap::new();
        let mut tasks = JoinSet::new();

        for (index, instance) in plan.instances.iter().enumerate() {
            if let Some(reason) = self.skip_reason(instance) {
                let mut skipped = InstanceReport::pending(instance);
                skipped.skip(reason.clone());
                self.handlers
                    .emit(RunEvent::InstanceSkipped {
                        instance: instance.name.clone(),
                        reason,
                    })
                    .await;
                slots[index] = Some(skipped);
                continue;
            }

            let limit = instance.max_parallel.map(|max| {
                limits
                    .entry(instance.job_id.clone())
                    .or_insert_with(|| Arc::new(Semaphore::new(max.max(1))))
                    .clone()
            });
            let runner = self.runner.clone();
            let handlers = self.handlers.clone();
            let instance = instance.clone();
            tasks.spawn(async move {
                // Held until the instance finishes
                let _permit = match limit {
                    Some(limit) => limit.acquire_owned().await.ok(),
                    None => None,
                };
                let instance_report = run_instance(runner.as_ref(), &instance, &handlers).await;
                (index, instance_report)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, instance_report)) => slots[index] = Some(instance_report),
                Err(e) => error!("instance task failed: {}", e),
            }
        }

        // A task that panicked leaves its slot empty; report it as failed
        report.instances = slots
            .into_iter()
            .zip(&plan.instances)
            .map(|(slot, instance)| {
                slot.unwrap_or_else(|| {
                    let mut failed = InstanceReport::pending(instance);
                    failed.status = JobStatus::Failure;
                    failed.finished_at = Some(Utc::now());
                    failed
                })
            })
            .collect();
        report.finished_at = Some(Utc::now());

        let succeeded = report.succeeded();
        info!(
            "Local run {} finished: {} succeeded, {} failed, {} skipped",
            run_id,
            report.count(JobStatus::Success),
            report.count(JobStatus::Failure),
            report.count(JobStatus::Skipped)
        );
        self.handlers
            .emit(RunEvent::RunFinished { run_id, succeeded })
            .await;

        report
    }

    fn skip_reason(&self, instance: &JobInstance) -> Option<String> {
        if self.all_platforms {
            return None;
        }
        match instance.os {
            Some(os) if os == self.host => None,
            Some(os) => Some(format!("runs on {}, host is {}", os, self.host)),
            None => Some(format!("unknown runner label '{}'", instance.runs_on)),
        }
    }
}

async fn run_instance<R: StepRunner + ?Sized>(
    runner: &R,
    instance: &JobInstance,
    handlers: &Handlers,
) -> InstanceReport {
    let mut report = InstanceReport::pending(instance);
    report.start();
    handlers
        .emit(RunEvent::InstanceStarted {
            instance: instance.name.clone(),
        })
        .await;

    let mut failed = false;
    for (step, step_report) in instance.steps.iter().zip(report.steps.iter_mut()) {
        if failed {
            step_report.status = StepStatus::Skipped;
            continue;
        }

        handlers
            .emit(RunEvent::StepStarted {
                instance: instance.name.clone(),
                step: step.name.clone(),
            })
            .await;

        match runner.run(instance, step).await {
            Ok(StepOutcome {
                success,
                output,
                exit_code,
            }) => {
                step_report.status = if success {
                    StepStatus::Succeeded
                } else {
                    StepStatus::Failed
                };
                step_report.output = output;
                step_report.exit_code = exit_code;
            }
            Err(e) => {
                warn!("{}: '{}' could not run: {}", instance.name, step.name, e);
                step_report.status = StepStatus::Failed;
                step_report.error = Some(e.to_string());
            }
        }

        failed = step_report.status == StepStatus::Failed;
        handlers
            .emit(RunEvent::StepFinished {
                instance: instance.name.clone(),
                step: step.name.clone(),
                status: step_report.status,
            })
            .await;
    }

    report.finish();
    handlers
        .emit(RunEvent::InstanceFinished {
            instance: instance.name.clone(),
            status: report.status,
        })
        .await;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::RunnerError;
    use crate::workflow::{plan, Event, PlannedStep, WorkflowConfig};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Fails every step whose name is listed, succeeds otherwise
    struct ScriptedRunner {
        failing: Vec<&'static str>,
        calls: AtomicUsize,
    }

    fn scripted(failing: Vec<&'static str>) -> ScriptedRunner {
        ScriptedRunner {
            failing,
            calls: AtomicUsize::new(0),
        }
    }

    #[async_trait]
    impl StepRunner for ScriptedRunner {
        async fn run(
            &self,
            _instance: &JobInstance,
            step: &PlannedStep,
        ) -> Result<StepOutcome, RunnerError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(StepOutcome {
                success: !self.failing.iter().any(|name| *name == step.name),
                output: String::new(),
                exit_code: Some(0),
            })
        }
    }

    /// Tracks how many steps are in flight at once
    #[derive(Default)]
    struct CountingRunner {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl StepRunner for CountingRunner {
        async fn run(
            &self,
            _instance: &JobInstance,
            _step: &PlannedStep,
        ) -> Result<StepOutcome, RunnerError> {
            let running = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(running, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(StepOutcome::satisfied("counted"))
        }
    }

    const YAML: &str = r#"
on: push
jobs:
  check:
    strategy:
      fail-fast: false
      matrix:
        os: [ubuntu-latest, macos-latest]
    runs-on: ${{ matrix.os }}
    steps:
      - name: compile
        run: cargo check
      - name: test
        run: cargo test --all-features
"#;

    const THREE_WIDE: &str = r#"
on: push
jobs:
  test:
    strategy:
      fail-fast: false
      max-parallel: 1
      matrix:
        os: [ubuntu-latest, macos-latest, windows-latest]
    runs-on: ${{ matrix.os }}
    steps:
      - run: cargo check
      - run: cargo test --all-features
"#;

    fn push_plan(yaml: &str) -> Plan {
        let workflow = WorkflowConfig::from_yaml(yaml).unwrap();
        plan(&workflow, &Event::push("main"))
    }

    async fn peak_concurrency(yaml: &str) -> usize {
        let executor = LocalExecutor::new(CountingRunner::default()).with_all_platforms(true);
        let report = executor.execute(&push_plan(yaml)).await;
        assert!(report.succeeded());
        executor.runner.peak.load(Ordering::SeqCst)
    }

    #[tokio::test]
    async fn test_failed_step_skips_the_rest() {
        let executor = LocalExecutor::new(scripted(vec!["compile"])).with_all_platforms(true);
        let report = executor.execute(&push_plan(YAML)).await;

        assert!(!report.succeeded());
        for instance in &report.instances {
            assert_eq!(instance.status, JobStatus::Failure);
            assert_eq!(instance.steps[0].status, StepStatus::Failed);
            assert_eq!(instance.steps[1].status, StepStatus::Skipped);
        }
        assert_eq!(executor.runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_other_platforms_are_skipped() {
        let executor = LocalExecutor::new(scripted(vec![])).with_host(Os::MacOs);
        let report = executor.execute(&push_plan(YAML)).await;

        assert!(report.succeeded());
        assert_eq!(report.instances[0].status, JobStatus::Skipped);
        assert_eq!(report.instances[1].status, JobStatus::Success);
        let reason = report.instances[0].skip_reason.as_deref().unwrap();
        assert!(reason.contains("Linux"));
    }

    #[tokio::test]
    async fn test_events_are_emitted_in_order_per_instance() {
        let executor = LocalExecutor::new(scripted(vec![])).with_host(Os::Linux);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        executor
            .add_event_handler(move |event| sink.lock().unwrap().push(event))
            .await;

        executor.execute(&push_plan(YAML)).await;

        let events = seen.lock().unwrap();
        match events.first() {
            Some(RunEvent::RunStarted { instances, .. }) => assert_eq!(*instances, 2),
            other => panic!("expected run start, got {:?}", other),
        }
        match events.last() {
            Some(RunEvent::RunFinished { succeeded, .. }) => assert!(*succeeded),
            other => panic!("expected run finish, got {:?}", other),
        }
        let skipped_macos = events.iter().any(|e| match e {
            RunEvent::InstanceSkipped { instance, .. } => instance.contains("macos"),
            _ => false,
        });
        assert!(skipped_macos);
        let finished = events
            .iter()
            .filter(|e| matches!(e, RunEvent::StepFinished { .. }))
            .count();
        assert_eq!(finished, 2);
    }

    #[tokio::test]
    async fn test_max_parallel_limits_concurrent_instances() {
        assert_eq!(peak_concurrency(THREE_WIDE).await, 1);

        let two_at_once = THREE_WIDE.replace("max-parallel: 1", "max-parallel: 2");
        assert_eq!(peak_concurrency(&two_at_once).await, 2);

        let unlimited = THREE_WIDE.replace("      max-parallel: 1\n", "");
        assert_eq!(peak_concurrency(&unlimited).await, 3);
    }
}
