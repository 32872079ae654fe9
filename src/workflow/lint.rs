//! Structural checks for a Rust CI workflow
//!
//! A conforming workflow runs a formatting check once, and verifies the crate
//! on Linux, macOS and Windows with independent matrix instances that
//! compile-check first and then test with every feature enabled. It runs on
//! every push and on release creation only.

use crate::workflow::config::{matrix_reference, JobConfig, WorkflowConfig};
use crate::workflow::plan::{expand_job, plan_steps, JobInstance, MatrixCombination, PlannedStep};
use crate::workflow::{Os, ReleaseAction, StepKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// The rule a lint issue violates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LintRule {
    /// `push` must trigger the workflow for every branch and path
    PushUnconditional,
    /// `release` must trigger on `created` and nothing else
    ReleaseCreatedOnly,
    /// `cargo fmt` must check rather than rewrite
    FormatCheckOnly,
    /// The formatting job must run on exactly one platform
    FormatSinglePlatform,
    /// `cargo check` must run, and before `cargo test`
    CheckBeforeTest,
    /// `cargo test` must enable every feature
    TestAllFeatures,
    /// Matrix instances must not cancel each other
    MatrixIndependent,
    /// Matrix instances must run identical steps
    NoPlatformDivergence,
    /// Tests must run on Linux, macOS and Windows
    PlatformCoverage,
}

impl LintRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            LintRule::PushUnconditional => "push-unconditional",
            LintRule::ReleaseCreatedOnly => "release-created-only",
            LintRule::FormatCheckOnly => "format-check-only",
            LintRule::FormatSinglePlatform => "format-single-platform",
            LintRule::CheckBeforeTest => "check-before-test",
            LintRule::TestAllFeatures => "test-all-features",
            LintRule::MatrixIndependent => "matrix-independent",
            LintRule::NoPlatformDivergence => "no-platform-divergence",
            LintRule::PlatformCoverage => "platform-coverage",
        }
    }
}

impl fmt::Display for LintRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One violated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LintIssue {
    pub rule: LintRule,

    /// The offending job, for job-level rules
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job: Option<String>,

    pub message: String,
}

impl LintIssue {
    fn workflow(rule: LintRule, message: impl Into<String>) -> Self {
        Self {
            rule,
            job: None,
            message: message.into(),
        }
    }

    fn job(rule: LintRule, job: &str, message: impl Into<String>) -> Self {
        Self {
            rule,
            job: Some(job.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.job {
            Some(job) => write!(f, "[{}] job '{}': {}", self.rule, job, self.message),
            None => write!(f, "[{}] {}", self.rule, self.message),
        }
    }
}

/// Check a workflow against every rule
pub fn lint(workflow: &WorkflowConfig) -> Vec<LintIssue> {
    let mut issues = Vec::new();

    lint_triggers(workflow, &mut issues);

    let mut tested_on: BTreeSet<Os> = BTreeSet::new();
    let mut any_tests = false;

    for (id, job) in workflow.jobs.iter() {
        let kinds: Vec<StepKind> = job.steps.iter().map(StepKind::classify).collect();
        let instances = expand_job(id, job);

        if let Some(fmt) = kinds.iter().find(|k| k.cargo_command() == Some("fmt")) {
            if !fmt.cargo_has_arg("--check") {
                issues.push(LintIssue::job(
                    LintRule::FormatCheckOnly,
                    id,
                    "cargo fmt runs without --check and would rewrite the tree",
                ));
            }
            if instances.len() != 1 {
                issues.push(LintIssue::job(
                    LintRule::FormatSinglePlatform,
                    id,
                    format!("fmt runs in {} instances, expected 1", instances.len()),
                ));
            }
        }

        let test_at = kinds.iter().position(|k| k.cargo_command() == Some("test"));
        if let Some(test_at) = test_at {
            any_tests = true;
            tested_on.extend(instances.iter().filter_map(|i| i.os));

            match kinds.iter().position(|k| k.cargo_command() == Some("check")) {
                Some(check_at) if check_at < test_at => {}
                Some(_) => issues.push(LintIssue::job(
                    LintRule::CheckBeforeTest,
                    id,
                    "cargo check runs after cargo test",
                )),
                None => issues.push(LintIssue::job(
                    LintRule::CheckBeforeTest,
                    id,
                    "cargo test runs without a preceding cargo check",
                )),
            }

            for kind in kinds.iter().filter(|k| k.cargo_command() == Some("test")) {
                if !kind.cargo_has_arg("--all-features") {
                    issues.push(LintIssue::job(
                        LintRule::TestAllFeatures,
                        id,
                        format!("'{}' does not pass --all-features", kind.describe()),
                    ));
                }
            }
        }

        if instances.len() > 1 {
            lint_matrix_job(id, job, &instances, &mut issues);
        }
    }

    if !any_tests {
        issues.push(LintIssue::workflow(
            LintRule::TestAllFeatures,
            "no job runs cargo test",
        ));
    } else {
        let missing: Vec<String> = Os::ALL
            .iter()
            .filter(|os| !tested_on.contains(os))
            .map(|os| os.to_string())
            .collect();
        if !missing.is_empty() {
            issues.push(LintIssue::workflow(
                LintRule::PlatformCoverage,
                format!("tests never run on {}", missing.join(", ")),
            ));
        }
    }

    issues
}

fn lint_triggers(workflow: &WorkflowConfig, issues: &mut Vec<LintIssue>) {
    match &workflow.triggers.push {
        Some(filter) if filter.is_unconditional() => {}
        Some(_) => issues.push(LintIssue::workflow(
            LintRule::PushUnconditional,
            "push is restricted by ref or path filters",
        )),
        None => issues.push(LintIssue::workflow(
            LintRule::PushUnconditional,
            "workflow does not run on push",
        )),
    }

    match &workflow.triggers.release {
        Some(filter) if filter.types == [ReleaseAction::Created] => {}
        Some(filter) if filter.types.is_empty() => issues.push(LintIssue::workflow(
            LintRule::ReleaseCreatedOnly,
            "release triggers on every activity type, expected only 'created'",
        )),
        Some(filter) => {
            let types: Vec<&str> = filter.types.iter().map(|t| t.as_str()).collect();
            issues.push(LintIssue::workflow(
                LintRule::ReleaseCreatedOnly,
                format!(
                    "release triggers on [{}], expected only 'created'",
                    types.join(", ")
                ),
            ));
        }
        None => issues.push(LintIssue::workflow(
            LintRule::ReleaseCreatedOnly,
            "workflow does not run on release creation",
        )),
    }
}

fn lint_matrix_job(
    id: &str,
    job: &JobConfig,
    instances: &[JobInstance],
    issues: &mut Vec<LintIssue>,
) {
    if job.strategy.as_ref().is_some_and(|s| s.fail_fast) {
        issues.push(LintIssue::job(
            LintRule::MatrixIndependent,
            id,
            "fail-fast is enabled, one failing platform would cancel the others",
        ));
    }

    for step in &job.steps {
        let Some(condition) = step.condition.as_deref() else {
            continue;
        };
        if condition.contains("matrix.") {
            let label = step
                .name
                .clone()
                .unwrap_or_else(|| StepKind::classify(step).describe());
            issues.push(LintIssue::job(
                LintRule::NoPlatformDivergence,
                id,
                format!("step '{}' only runs when {}", label, condition),
            ));
        }
    }

    lint_planned_divergence(id, job, instances, issues);
}

/// First instance seen for a group of non-platform axis values
type Baseline<'a> = (MatrixCombination, &'a JobInstance, Vec<PlannedStep>);

/// Instances that differ only in their platform must plan identical steps
///
/// Values of the keys `runs-on` reads are blanked out before planning, and
/// instances are compared within groups sharing every other axis value.
fn lint_planned_divergence(
    id: &str,
    job: &JobConfig,
    instances: &[JobInstance],
    issues: &mut Vec<LintIssue>,
) {
    let platform_keys: BTreeSet<&str> = matrix_reference()
        .captures_iter(&job.runs_on)
        .filter_map(|caps| caps.get(1))
        .map(|key| key.as_str())
        .collect();
    if platform_keys.is_empty() {
        return;
    }
    let axes: BTreeSet<&str> = match &job.strategy {
        Some(strategy) => strategy.matrix.axes.keys().collect(),
        None => BTreeSet::new(),
    };

    let mut baselines: Vec<Baseline<'_>> = Vec::new();
    for instance in instances {
        let mut group = MatrixCombination::new();
        let mut normalized = MatrixCombination::new();
        for (key, value) in &instance.matrix {
            if platform_keys.contains(key.as_str()) {
                normalized.push((key.clone(), format!("<{}>", key)));
                continue;
            }
            if axes.contains(key.as_str()) {
                group.push((key.clone(), value.clone()));
            }
            normalized.push((key.clone(), value.clone()));
        }

        let steps = plan_steps(job, &normalized);
        match baselines.iter().find(|(g, _, _)| *g == group) {
            Some((_, baseline, expected)) => {
                if *expected != steps {
                    issues.push(LintIssue::job(
                        LintRule::NoPlatformDivergence,
                        id,
                        format!("'{}' diverges from '{}'", instance.name, baseline.name),
                    ));
                }
            }
            None => baselines.push((group, instance, steps)),
        }
    }
}
