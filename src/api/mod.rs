//! Orchestration API for k2cli cluster actions.
//!
//! [`plan_cluster_action`] loads the cluster configuration and fixes the
//! container name and command. [`run_cluster_action`] then connects to the
//! engine, pulls the image, derives mounts and environment, runs the task
//! container through its lifecycle and collects recovery hints.
//!
//! Nothing here prints to stdout or stderr or exits the process. The CLI
//! adapter renders the returned [`ActionReport`].

mod action;
mod baseline;
mod command;
mod hints;
mod output;

pub use action::{
    ActionPlan, ActionReport, RunParams, plan_cluster_action, run_cluster_action,
    run_cluster_action_with_client,
};
pub use baseline::{baseline_env, baseline_mounts, helm_override_var};
pub use command::{ALL_STAGES, ClusterAction};
pub use hints::{PARTIAL_STATE_NOTICE, recovery_hints};
pub use output::{ensure_directory, write_output_log};
