//! Checks this repository's own CI workflow

mod helpers;

use helpers::*;
use open_command::workflow::{Event, Os, ReleaseAction, StepKind};
use open_command::{lint, plan};

#[test]
fn test_repository_workflow_is_lint_clean() {
    let issues = lint(&repo_workflow());
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
}

#[test]
fn test_fmt_runs_on_one_platform_with_check() {
    let plan = plan(&repo_workflow(), &Event::push("main"));
    let fmt: Vec<_> = plan.instances_of("fmt").collect();
    assert_eq!(fmt.len(), 1);
    assert_eq!(fmt[0].os, Some(Os::Linux));
    let fmt_step = fmt[0]
        .steps
        .iter()
        .find(|s| s.kind.cargo_command() == Some("fmt"))
        .unwrap();
    assert!(fmt_step.kind.cargo_has_arg("--check"));
}

#[test]
fn test_verification_instances_differ_only_by_platform() {
    let plan = plan(&repo_workflow(), &Event::push("main"));
    let instances: Vec<_> = plan.instances_of("test").collect();
    assert_eq!(instances.len(), 3);

    let platforms: Vec<Option<Os>> = instances.iter().map(|i| i.os).collect();
    assert_eq!(
        platforms,
        vec![Some(Os::Linux), Some(Os::MacOs), Some(Os::Windows)]
    );

    let first = &instances[0].steps;
    for instance in &instances[1..] {
        assert_eq!(&instance.steps, first, "{} diverges", instance.name);
    }
}

#[test]
fn test_verification_checks_then_tests_with_all_features() {
    let plan = plan(&repo_workflow(), &Event::push("main"));
    for instance in plan.instances_of("test") {
        let cargo: Vec<&StepKind> = instance
            .steps
            .iter()
            .map(|s| &s.kind)
            .filter(|k| k.cargo_command().is_some())
            .collect();
        assert_eq!(cargo[0].cargo_command(), Some("check"));
        assert_eq!(cargo[1].cargo_command(), Some("test"));
        assert!(cargo[1].cargo_has_arg("--all-features"));

        let cache = StepKind::Cache {
            retain_on_failure: true,
        };
        assert!(instance.steps.iter().any(|s| s.kind == cache));
    }
}

#[test]
fn test_push_to_any_branch_schedules_everything() {
    let workflow = repo_workflow();
    for branch in ["main", "feature/x", "release-1.0"] {
        let plan = plan(&workflow, &Event::push(branch));
        assert_eq!(plan.len(), 4, "push to {}", branch);
        assert_eq!(plan.instances_of("fmt").count(), 1);
        assert_eq!(plan.instances_of("test").count(), 3);
    }
}

#[test]
fn test_release_created_schedules_like_push() {
    let workflow = repo_workflow();
    let on_push = plan(&workflow, &Event::push("main"));
    let on_release = plan(&workflow, &Event::release(ReleaseAction::Created));
    assert_eq!(on_release.instances, on_push.instances);
}

#[test]
fn test_other_release_activity_schedules_nothing() {
    let workflow = repo_workflow();
    for action in ReleaseAction::ALL {
        let plan = plan(&workflow, &Event::release(action));
        if action == ReleaseAction::Created {
            assert!(!plan.is_empty());
        } else {
            assert!(plan.is_empty(), "release {} scheduled jobs", action);
        }
    }
}

#[tokio::test]
async fn test_fmt_failure_leaves_verification_independent() {
    let plan = plan(&repo_workflow(), &Event::push("main"));
    let runner = MockRunner::new()
        .with_failure("fmt", "cargo fmt --all -- --check")
        .with_failure("test", "cargo test --all-features");
    let report = run_plan_with_mock(&plan, runner.clone()).await;

    assert!(!report.succeeded());
    assert_instance_failed_at(&report, "Rustfmt", "cargo fmt --all -- --check");
    for os in ["ubuntu-latest", "macos-latest", "windows-latest"] {
        let name = format!("Test ({})", os);
        assert_instance_failed_at(&report, &name, "cargo test --all-features");
        let steps = instance(&report, &name).steps.len();
        assert_eq!(runner.calls_for(&name).len(), steps);
    }
}

#[tokio::test]
async fn test_fmt_failure_alone_keeps_verification_green() {
    let plan = plan(&repo_workflow(), &Event::push("main"));
    let runner = MockRunner::new().with_failure("fmt", "cargo fmt --all -- --check");
    let report = run_plan_with_mock(&plan, runner).await;

    assert_instance_failed_at(&report, "Rustfmt", "cargo fmt --all -- --check");
    assert_eq!(report.instances_of("test").count(), 3);
    for instance in report.instances_of("test") {
        assert_instance_succeeded(&report, &instance.name);
    }
}
