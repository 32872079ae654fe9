use anyhow::{Context, Result};
use open_command::cli::commands::{
    CiCommand, LintCommand, OpenCommand, PlanCommand, RunCommand, ValidateCommand, WorkflowArgs,
};
use open_command::cli::output::*;
use open_command::cli::{default_settings_path, Cli, Command};
use open_command::execution::{CommandStepRunner, LocalExecutor, RunEvent};
use open_command::opener::{describe, Opener};
use open_command::workflow::{lint, plan, WorkflowConfig};
use open_command::Settings;
use std::path::PathBuf;
use tracing::{debug, error, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    let fallback = default_settings_path();
    let settings = Settings::load(cli.config.as_deref(), fallback.as_deref())
        .context("Failed to load settings")?;
    debug!("Using settings {:?}", settings);

    // Execute command
    match &cli.command {
        Command::Open(cmd) => open_target(cmd, &settings)?,
        Command::Ci(CiCommand::Validate(cmd)) => validate_workflow(cmd, &settings)?,
        Command::Ci(CiCommand::Lint(cmd)) => lint_workflow(cmd, &settings)?,
        Command::Ci(CiCommand::Plan(cmd)) => plan_workflow(cmd, &settings)?,
        Command::Ci(CiCommand::Run(cmd)) => run_workflow(cmd, &settings).await?,
    }

    Ok(())
}

fn open_target(cmd: &OpenCommand, settings: &Settings) -> Result<()> {
    let opener = Opener::new(settings.opener_config());
    let target = cmd.target.as_str();
    let mut command = if cmd.browser {
        opener.open_browser(target)?
    } else if cmd.editor {
        opener.open_editor(target)?
    } else {
        opener.open(target)?
    };

    if cmd.dry_run {
        println!("{}", describe(&command));
        return Ok(());
    }

    let status = command
        .status()
        .with_context(|| format!("Failed to run {}", describe(&command)))?;
    if !status.success() {
        error!("{} exited with {}", describe(&command), status);
        std::process::exit(status.code().unwrap_or(1));
    }
    Ok(())
}

fn workflow_path(args: &WorkflowArgs, settings: &Settings) -> PathBuf {
    args.file.clone().unwrap_or_else(|| settings.workflow.clone())
}

fn load_workflow(args: &WorkflowArgs, settings: &Settings) -> Result<WorkflowConfig> {
    WorkflowConfig::from_file(workflow_path(args, settings)).context("Failed to load workflow")
}

fn validate_workflow(cmd: &ValidateCommand, settings: &Settings) -> Result<()> {
    println!("{} Validating workflow...", INFO);

    match load_workflow(&cmd.workflow, settings) {
        Ok(workflow) => {
            println!("{} Workflow configuration is valid!", CHECK);
            if let Some(name) = &workflow.name {
                println!("  Name: {}", style(name).bold());
            }
            println!("  Jobs: {}", style(workflow.jobs.len()).cyan());

            if cmd.json {
                let json = serde_json::to_string_pretty(&workflow)?;
                println!("\n{}", json);
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn lint_workflow(cmd: &LintCommand, settings: &Settings) -> Result<()> {
    let workflow = load_workflow(&cmd.workflow, settings)?;
    let issues = lint(&workflow);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else if issues.is_empty() {
        println!("{} No issues found", CHECK);
    } else {
        for issue in &issues {
            println!("{}", format_lint_issue(issue));
        }
        println!("\n{} {} issue(s) found", CROSS, style(issues.len()).red());
    }

    if !issues.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}

fn plan_workflow(cmd: &PlanCommand, settings: &Settings) -> Result<()> {
    let workflow = load_workflow(&cmd.workflow, settings)?;
    let event = cmd.event.to_event()?;
    let plan = plan(&workflow, &event);

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("{} {} schedules no jobs", INFO, style(&event).bold());
        return Ok(());
    }

    println!(
        "{} {} schedules {} instance(s):",
        INFO,
        style(&event).bold(),
        style(plan.len()).cyan()
    );
    for instance in &plan.instances {
        println!("{}", format_instance(instance));
    }
    Ok(())
}

async fn run_workflow(cmd: &RunCommand, settings: &Settings) -> Result<()> {
    let workflow = load_workflow(&cmd.workflow, settings)?;
    let event = cmd.event.to_event()?;
    let plan = plan(&workflow, &event);

    let working_dir = match &cmd.working_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let timeout = cmd.timeout_secs.unwrap_or(settings.step_timeout_secs);
    let runner = CommandStepRunner::new(working_dir, timeout);
    let executor = LocalExecutor::new(runner).with_all_platforms(cmd.all_platforms);

    let progress = (!cmd.json).then(|| create_progress_bar(plan.len()));
    if let Some(progress) = progress.clone() {
        executor
            .add_event_handler(move |event| {
                if matches!(
                    event,
                    RunEvent::InstanceFinished { .. } | RunEvent::InstanceSkipped { .. }
                ) {
                    progress.inc(1);
                }
                progress.println(format_run_event(&event));
            })
            .await;
    }

    let report = executor.execute(&plan).await;
    if let Some(progress) = &progress {
        progress.finish_and_clear();
    }

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        for instance in &report.instances {
            println!("{}", format_instance_report(instance));
        }
        println!("\n{}", format_run_summary(&report));
    }

    if !report.succeeded() {
        std::process::exit(1);
    }
    Ok(())
}
