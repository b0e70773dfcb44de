//! Command-line argument definitions for k2cli.

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};

/// Command-line interface for k2cli.
#[derive(Debug, Parser)]
#[command(name = "k2cli")]
#[command(
    author,
    version,
    about = "Drive K2 cluster automation runs in a container"
)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Path to the k2cli settings file.
    #[arg(short = 'k', long, global = true)]
    pub k2config: Option<Utf8PathBuf>,

    /// Path to the cluster configuration.
    #[arg(short = 'c', long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Task container image.
    #[arg(short = 'i', long, global = true)]
    pub image: Option<String>,

    /// Output folder for cluster state.
    #[arg(short = 'o', long, global = true)]
    pub output: Option<Utf8PathBuf>,

    /// Container engine address.
    #[arg(short = 'd', long, global = true)]
    pub docker_host: Option<String>,

    /// Use TLS with the engine API.
    #[arg(long, global = true, num_args = 0..=1, default_missing_value = "true")]
    pub tls: Option<bool>,

    /// Use TLS and verify the engine API.
    #[arg(long = "tlsverify", global = true, num_args = 0..=1, default_missing_value = "true")]
    pub tls_verify: Option<bool>,

    /// Trust certificates signed only by this CA.
    #[arg(long = "tlscacert", global = true)]
    pub tls_ca_cert: Option<Utf8PathBuf>,

    /// Path to the TLS certificate file.
    #[arg(long = "tlscert", global = true)]
    pub tls_cert: Option<Utf8PathBuf>,

    /// Path to the TLS key file.
    #[arg(long = "tlskey", global = true)]
    pub tls_key: Option<Utf8PathBuf>,

    /// Timeout in seconds for container actions.
    #[arg(short = 't', long, global = true)]
    pub timeout: Option<u64>,

    /// Keep stopped containers.
    #[arg(short = 'a', long, global = true)]
    pub keep_alive: bool,

    /// Save the output of the container action to this path.
    #[arg(short = 'w', long, global = true)]
    pub log_path: Option<Utf8PathBuf>,

    /// Display full action logs on success.
    #[arg(short = 'x', long, global = true)]
    pub log_success: bool,

    /// Stream task output while it runs.
    #[arg(short = 'v', long, alias = "verbosity", global = true)]
    pub verbose: bool,

    /// Registry user name.
    #[arg(short = 'u', long, global = true)]
    pub user: Option<String>,

    /// Registry password.
    #[arg(short = 'p', long, global = true)]
    pub password: Option<String>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage a K2 cluster.
    #[command(subcommand)]
    Cluster(ClusterCommand),
}

/// Cluster subcommands.
#[derive(Debug, Subcommand)]
pub enum ClusterCommand {
    /// Create a K2 cluster described in the given configuration.
    Up(UpArgs),

    /// Update node pools of a K2 cluster described in the given configuration.
    Update(UpdateArgs),
}

/// Arguments for `cluster up`.
#[derive(Debug, Args)]
pub struct UpArgs {
    /// Path to the cluster configuration; overrides `--config`.
    #[arg(id = "positional_config", value_name = "CONFIG")]
    pub config: Option<String>,

    /// Comma-separated list of K2 stages to run.
    #[arg(short = 's', long, default_value = "all")]
    pub stages: String,
}

/// Arguments for `cluster update`.
#[derive(Debug, Args)]
pub struct UpdateArgs {
    /// Path to the cluster configuration; overrides `--config`.
    #[arg(id = "positional_config", value_name = "CONFIG")]
    pub config: Option<String>,

    /// Comma-separated list of node pools to update.
    pub nodepools: Option<String>,
}

impl Commands {
    /// Returns the positional cluster configuration argument, if any.
    #[must_use]
    pub fn positional_config(&self) -> Option<&str> {
        match self {
            Self::Cluster(ClusterCommand::Up(args)) => args.config.as_deref(),
            Self::Cluster(ClusterCommand::Update(args)) => args.config.as_deref(),
        }
    }
}
