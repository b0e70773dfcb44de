//! `k2cli` application entry point.
//!
//! This binary drives K2 cluster automation in a task container. It uses
//! `eyre` for opaque error handling at the application boundary, converting
//! domain-specific errors into human-readable reports.
//!
//! Configuration is loaded with layered precedence via `OrthoConfig`:
//! 1. Application defaults
//! 2. Settings file (`~/.config/k2cli/config.toml` or path from `K2CLI_CONFIG_PATH`)
//! 3. Environment variables (`K2CLI_*`)
//! 4. Command-line arguments

use std::process::ExitCode;

use clap::Parser;
use eyre::{Report, Result as EyreResult, WrapErr};
use k2cli::api::{
    ActionPlan, ActionReport, ClusterAction, RunParams, plan_cluster_action, run_cluster_action,
};
use k2cli::config::{AppConfig, Cli, ClusterCommand, Commands, load_config};
use k2cli::engine::RunOutcome;
use k2cli::error::Result as K2Result;
use k2cli::logging::init_logging;
use mockable::DefaultEnv;
use tokio::io::AsyncWrite;

/// Application entry point.
///
/// Loads configuration, installs logging, then runs the requested cluster
/// action. The process exit status is the action's exit status.
fn main() -> EyreResult<ExitCode> {
    let cli = Cli::parse();
    let config = load_config(&cli).map_err(Report::from)?;
    let env = DefaultEnv::new();
    init_logging(&config.logging, &env).map_err(Report::from)?;

    let action = cluster_action(&cli.command).map_err(Report::from)?;
    let plan = plan_cluster_action(&config, action, &env).map_err(Report::from)?;
    announce(&plan);

    let runtime = tokio::runtime::Runtime::new().wrap_err("failed to create tokio runtime")?;
    let report = run(runtime.handle(), &plan, &config, &env).map_err(Report::from)?;
    render(&plan, &config, &report);

    Ok(ExitCode::from(report.exit_status()))
}

fn cluster_action(command: &Commands) -> K2Result<ClusterAction> {
    match command {
        Commands::Cluster(ClusterCommand::Up(args)) => Ok(ClusterAction::up(&args.stages)),
        Commands::Cluster(ClusterCommand::Update(args)) => {
            ClusterAction::update(args.nodepools.as_deref()).map_err(Into::into)
        }
    }
}

/// Run the plan, streaming live output to stdout when verbose.
fn run(
    handle: &tokio::runtime::Handle,
    plan: &ActionPlan,
    config: &AppConfig,
    env: &DefaultEnv,
) -> K2Result<ActionReport> {
    let mut stdout = tokio::io::stdout();
    let live_output: Option<&mut (dyn AsyncWrite + Unpin + Send)> = if config.run.verbose {
        Some(&mut stdout)
    } else {
        None
    };
    run_cluster_action(
        handle,
        plan,
        RunParams {
            config,
            env,
            live_output,
        },
    )
}

#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn announce(plan: &ActionPlan) {
    println!("[{}]", plan.command.join(" "));
}

#[expect(clippy::print_stdout, reason = "CLI output is the intended behaviour")]
fn render(plan: &ActionPlan, config: &AppConfig, report: &ActionReport) {
    if matches!(report.task.outcome, RunOutcome::TimedOut) {
        println!("Action timed out!");
    }

    if report.succeeded() {
        println!("Done.");
    } else {
        println!(
            "ERROR {} {}",
            plan.action.progressive(),
            report.cluster_name
        );
    }

    if !report.succeeded() || config.run.log_success {
        println!("{}", report.output());
    }

    if let Some(preserved) = report.task.cleanup.preserved_as() {
        println!("Renamed {} to {preserved}", report.container_name);
    }

    for hint in &report.hints {
        println!("{hint}");
    }
}
