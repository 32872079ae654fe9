//! CLI output formatting

use crate::execution::{InstanceReport, JobStatus, RunEvent, RunReport, StepStatus};
use crate::workflow::{JobInstance, LintIssue};
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    if let Ok(progress_style) = ProgressStyle::default_bar().template(PROGRESS_TEMPLATE) {
        progress.set_style(progress_style.progress_chars("#>-"));
    }
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format a job status for display
pub fn format_job_status(status: JobStatus) -> String {
    match status {
        JobStatus::Pending => style("PENDING").dim().to_string(),
        JobStatus::Running => style("RUNNING").yellow().to_string(),
        JobStatus::Success => style("SUCCESS").green().to_string(),
        JobStatus::Failure => style("FAILURE").red().to_string(),
        JobStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a step status for display
pub fn format_step_status(status: StepStatus) -> String {
    match status {
        StepStatus::Pending => style("PENDING").dim().to_string(),
        StepStatus::Succeeded => style("OK").green().to_string(),
        StepStatus::Failed => style("FAILED").red().to_string(),
        StepStatus::Skipped => style("SKIPPED").dim().to_string(),
    }
}

/// Format a planned instance with its steps
pub fn format_instance(instance: &JobInstance) -> String {
    let mut out = format!(
        "{} {} {}",
        ROCKET,
        style(&instance.name).bold(),
        style(format!("[{}]", instance.runs_on)).dim()
    );
    if !instance.needs.is_empty() {
        let needs = instance.needs.join(", ");
        out.push_str(&format!(" needs {}", style(needs).cyan()));
    }
    for (index, step) in instance.steps.iter().enumerate() {
        out.push_str(&format!(
            "\n  {}. {} {}",
            index + 1,
            step.name,
            style(format!("({})", step.kind.describe())).dim()
        ));
        if let Some(condition) = &step.condition {
            out.push_str(&format!(" if {}", style(condition).yellow()));
        }
    }
    out
}

/// Format a lint finding
pub fn format_lint_issue(issue: &LintIssue) -> String {
    let job = issue
        .job
        .as_deref()
        .map(|job| format!(" {}", style(job).bold()))
        .unwrap_or_default();
    format!(
        "{} {}{}: {}",
        WARN,
        style(issue.rule).yellow(),
        job,
        issue.message
    )
}

/// Format an instance result with its failing step, if any
pub fn format_instance_report(report: &InstanceReport) -> String {
    let icon = match report.status {
        JobStatus::Success => CHECK,
        JobStatus::Failure => CROSS,
        JobStatus::Skipped => INFO,
        _ => SPINNER,
    };
    let mut out = format!(
        "{} {} - {}",
        icon,
        style(&report.name).bold(),
        format_job_status(report.status)
    );
    if let Some(reason) = &report.skip_reason {
        out.push_str(&format!(" ({})", style(reason).dim()));
    }
    if let Some(step) = report.failed_step() {
        out.push_str(&format!("\n  {} {}", CROSS, style(&step.name).red()));
        if let Some(error) = &step.error {
            out.push_str(&format!(": {}", style(error).dim()));
        } else if !step.output.is_empty() {
            out.push_str(&format!("\n{}", format_output(&step.output, 20)));
        }
    }
    out
}

/// Format the closing summary of a run
pub fn format_run_summary(report: &RunReport) -> String {
    let (icon, verdict) = if report.succeeded() {
        (CHECK, style("succeeded").green())
    } else {
        (CROSS, style("failed").red())
    };
    format!(
        "{} Run {} {} ({} success, {} failure, {} skipped)",
        icon,
        style(&report.run_id.to_string()[..8]).dim(),
        verdict,
        style(report.count(JobStatus::Success)).green(),
        style(report.count(JobStatus::Failure)).red(),
        style(report.count(JobStatus::Skipped)).dim()
    )
}

/// Format a run event for display
pub fn format_run_event(event: &RunEvent) -> String {
    match event {
        RunEvent::RunStarted {
            run_id,
            event,
            instances,
        } => format!(
            "{} Running {} instance(s) for {} ({})",
            ROCKET,
            style(instances).cyan(),
            style(event).bold(),
            style(&run_id.to_string()[..8]).dim()
        ),
        RunEvent::InstanceStarted { instance } => {
            format!("{} {}", SPINNER, style(instance).cyan())
        }
        RunEvent::InstanceSkipped { instance, reason } => {
            format!("{} {} skipped: {}", INFO, style(instance).dim(), reason)
        }
        RunEvent::StepStarted { instance, step } => {
            format!("  {} {} › {}", SPINNER, style(instance).dim(), step)
        }
        RunEvent::StepFinished {
            instance,
            step,
            status,
        } => {
            let icon = match status {
                StepStatus::Succeeded => CHECK,
                StepStatus::Failed => CROSS,
                _ => INFO,
            };
            format!(
                "  {} {} › {} {}",
                icon,
                style(instance).dim(),
                step,
                format_step_status(*status)
            )
        }
        RunEvent::InstanceFinished { instance, status } => {
            let icon = match status {
                JobStatus::Success => CHECK,
                _ => CROSS,
            };
            format!(
                "{} {} {}",
                icon,
                style(instance).bold(),
                format_job_status(*status)
            )
        }
        RunEvent::RunFinished { run_id, succeeded } => {
            let status_str = if *succeeded {
                format!("{} completed", style("successfully").green())
            } else {
                style("failed").red().to_string()
            };
            format!(
                "{} Run ({}) {}",
                INFO,
                style(&run_id.to_string()[..8]).dim(),
                status_str
            )
        }
    }
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}
