//! Cluster action orchestration: plan the run, then drive it on an engine.

use std::time::Duration;

use camino::Utf8PathBuf;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use super::baseline::{baseline_env, baseline_mounts};
use super::command::ClusterAction;
use super::hints::{PARTIAL_STATE_NOTICE, recovery_hints};
use super::output::{ensure_directory, write_output_log};
use crate::cluster::{ConfigNode, cluster_name, derive_mounts_and_env, load_cluster_config};
use crate::config::AppConfig;
use crate::engine::{
    ContainerRuntime, EngineConnector, ImagePuller, LifecycleManager, RunPolicy, TaskReport,
    TaskRun, container_name, pull, resolve,
};
use crate::error::Result as K2Result;

/// Everything decided before the engine is contacted.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionPlan {
    /// The action being run.
    pub action: ClusterAction,
    /// Path of the cluster configuration file.
    pub config_path: Utf8PathBuf,
    /// Directory receiving cluster state.
    pub output_dir: Utf8PathBuf,
    /// The parsed cluster configuration.
    pub cluster_config: ConfigNode,
    /// Name of the first declared cluster.
    pub cluster_name: String,
    /// Deterministic task container name.
    pub container_name: String,
    /// Command run in the container.
    pub command: Vec<String>,
}

/// Load the cluster configuration and build the command for `action`.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` when the cluster configuration does
/// not exist and `ConfigError::ParseError` when it is not valid YAML.
pub fn plan_cluster_action<E: mockable::Env>(
    config: &AppConfig,
    action: ClusterAction,
    env: &E,
) -> K2Result<ActionPlan> {
    let config_path = config.cluster_config_or_default(env);
    let output_dir = config.output_dir_or_default(env);
    let cluster_config = load_cluster_config(&config_path)?;
    let cluster = cluster_name(&cluster_config, env);
    let command = action.command_line(&config_path, &output_dir);

    Ok(ActionPlan {
        container_name: container_name(&cluster),
        cluster_name: cluster,
        action,
        config_path,
        output_dir,
        cluster_config,
        command,
    })
}

/// Inputs to running a planned action.
pub struct RunParams<'a, E: mockable::Env> {
    /// Application configuration.
    pub config: &'a AppConfig,
    /// Environment provider for passthrough and expansion.
    pub env: &'a E,
    /// Receives live task output while the container runs.
    pub live_output: Option<&'a mut (dyn AsyncWrite + Unpin + Send)>,
}

/// Result of a cluster action.
#[derive(Debug)]
pub struct ActionReport {
    /// Name of the cluster acted on.
    pub cluster_name: String,
    /// Name the task container was created with.
    pub container_name: String,
    /// The container's lifecycle result.
    pub task: TaskReport,
    /// Hints for reaching the cluster, prefixed with a notice on failure.
    pub hints: Vec<String>,
}

impl ActionReport {
    /// Whether the task completed with status zero.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.task.outcome.is_success()
    }

    /// Process exit status for the action.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        self.task.outcome.exit_status()
    }

    /// Captured task output, empty when it could not be fetched.
    #[must_use]
    pub fn output(&self) -> &str {
        self.task.output.as_deref().unwrap_or_default()
    }
}

/// Connect to the configured engine and run `plan`.
///
/// # Errors
///
/// Returns profile, connection, pull, create, cleanup and filesystem
/// errors. A non-zero exit or a timeout is reported in the
/// [`ActionReport`], not as an error.
pub fn run_cluster_action<E: mockable::Env>(
    runtime_handle: &tokio::runtime::Handle,
    plan: &ActionPlan,
    params: RunParams<'_, E>,
) -> K2Result<ActionReport> {
    let profile = resolve(&params.config.docker, params.env)?;
    runtime_handle.block_on(async {
        let docker = EngineConnector::connect_and_verify(&profile).await?;
        run_cluster_action_with_client(&docker, plan, params).await
    })
}

/// Run `plan` against an already connected `client`.
///
/// # Errors
///
/// As [`run_cluster_action`], minus connection errors.
pub async fn run_cluster_action_with_client<C, E>(
    client: &C,
    plan: &ActionPlan,
    params: RunParams<'_, E>,
) -> K2Result<ActionReport>
where
    C: ContainerRuntime + ImagePuller,
    E: mockable::Env,
{
    let RunParams {
        config,
        env,
        live_output,
    } = params;

    ensure_directory(&plan.output_dir)?;
    let image = config.image_or_default();
    pull(client, image, &config.registry).await?;

    let absent = ConfigNode::Absent;
    let deployment = plan.cluster_config.child("deployment").unwrap_or(&absent);
    let derived = derive_mounts_and_env(
        deployment,
        baseline_mounts(&plan.config_path, &plan.output_dir),
        env,
    )?;
    let mut task_env = baseline_env(&plan.output_dir, &plan.cluster_name, env);
    for entry in derived.env.iter().cloned() {
        task_env.insert(entry);
    }
    debug!(
        mounts = derived.mounts.len(),
        env = task_env.len(),
        "derived task container bindings"
    );

    let task = TaskRun::new(image, &plan.container_name)?
        .with_command(plan.command.clone())
        .with_env(&task_env)
        .with_mounts(&derived.mounts);
    let policy = RunPolicy::from_timeout(
        Duration::from_secs(config.run.timeout_secs),
        config.run.keep_alive,
    );

    info!(
        cluster = %plan.cluster_name,
        container = %plan.container_name,
        timeout_secs = config.run.timeout_secs,
        "running cluster action"
    );
    let manager = LifecycleManager::new(client);
    let report = match live_output {
        Some(writer) => manager.run_streaming(&task, policy, writer).await?,
        None => manager.run(&task, policy).await?,
    };

    if let (Some(log_path), Some(output)) = (&config.run.log_path, &report.output) {
        write_output_log(log_path, output.as_bytes())?;
        debug!(log_path = %log_path, "wrote task output log");
    }

    let found = recovery_hints(&plan.output_dir, &plan.cluster_name);
    let hints = if report.outcome.is_success() {
        found
    } else {
        std::iter::once(String::from(PARTIAL_STATE_NOTICE))
            .chain(found)
            .collect()
    };

    Ok(ActionReport {
        cluster_name: plan.cluster_name.clone(),
        container_name: plan.container_name.clone(),
        task: report,
        hints,
    })
}
