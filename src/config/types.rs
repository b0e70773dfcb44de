//! Configuration data types for k2cli.

use camino::Utf8PathBuf;
use clap::ValueEnum;
use ortho_config::{OrthoConfig, OrthoResult, PostMergeContext, PostMergeHook};
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

use crate::error::ConfigError;

/// Task image used when none is configured.
pub const DEFAULT_IMAGE: &str = "quay.io/samsung_cnct/k2:latest";

/// Task timeout used when none is configured.
pub const DEFAULT_TIMEOUT_SECS: u64 = 1200;

/// Directory under `$HOME` holding cluster state and the default
/// configuration.
const KRAKEN_DIR: &str = ".kraken";

/// Cluster configuration file name inside [`KRAKEN_DIR`].
const DEFAULT_CLUSTER_CONFIG: &str = "config.yaml";

/// Output format of diagnostic logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Task run configuration.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Deserialize, Serialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seconds to wait for the task container before giving up.
    #[default(DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Keep the container (renamed) instead of removing it after the run.
    pub keep_alive: bool,

    /// File that receives the captured task output.
    pub log_path: Option<Utf8PathBuf>,

    /// Print the captured output even when the task succeeds.
    pub log_success: bool,

    /// Stream task output while it runs.
    pub verbose: bool,
}

/// Container engine connection overrides.
///
/// Unset fields fall back to the `DOCKER_*` environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Engine endpoint, e.g. `unix:///var/run/docker.sock` or `tcp://host:2376`.
    pub host: Option<String>,

    /// Engine API version as `MAJOR.MINOR`.
    pub api_version: Option<String>,

    /// Use TLS; implied by `tls_verify`.
    pub tls: Option<bool>,

    /// Use TLS and verify the remote.
    pub tls_verify: Option<bool>,

    /// CA certificate used to verify the engine.
    pub tls_ca_cert: Option<Utf8PathBuf>,

    /// Client certificate.
    pub tls_cert: Option<Utf8PathBuf>,

    /// Client private key.
    pub tls_key: Option<Utf8PathBuf>,
}

/// Registry credentials used when pulling the task image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Registry user name.
    pub username: Option<String>,

    /// Registry password.
    pub password: Option<String>,
}

impl RegistryConfig {
    /// Returns the user name and password when both are set.
    #[must_use]
    pub fn credentials(&self) -> Option<(&str, &str)> {
        self.username.as_deref().zip(self.password.as_deref())
    }
}

/// Diagnostic logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, SmartDefault, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by `RUST_LOG`.
    #[default("info")]
    pub level: String,

    /// Output format.
    pub format: LogFormat,
}

/// Root application configuration.
///
/// Layers are merged with increasing precedence: defaults, configuration
/// file, environment variables, command-line arguments.
///
/// Configuration files are discovered in this order:
/// 1. Path specified via `K2CLI_CONFIG_PATH` environment variable
/// 2. `.k2cli.toml` in the current working directory
/// 3. `.k2cli.toml` in the home directory
/// 4. `~/.config/k2cli/config.toml` (XDG default)
#[derive(Debug, Clone, Default, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(
    prefix = "K2CLI",
    post_merge_hook,
    discovery(
        app_name = "k2cli",
        env_var = "K2CLI_CONFIG_PATH",
        config_file_name = "config.toml",
        dotfile_name = ".k2cli.toml",
        config_cli_long = "k2config",
        config_cli_visible = true,
    )
)]
pub struct AppConfig {
    /// Task container image.
    pub image: Option<String>,

    /// Directory receiving cluster state and artefacts.
    pub output_dir: Option<Utf8PathBuf>,

    /// Cluster configuration document.
    pub cluster_config: Option<Utf8PathBuf>,

    /// Task run configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub run: RunConfig,

    /// Container engine connection overrides.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub docker: DockerConfig,

    /// Registry credentials.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub registry: RegistryConfig,

    /// Diagnostic logging configuration.
    #[serde(default)]
    #[ortho_config(skip_cli)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Returns the configured image or [`DEFAULT_IMAGE`].
    #[must_use]
    pub fn image_or_default(&self) -> &str {
        self.image.as_deref().unwrap_or(DEFAULT_IMAGE)
    }

    /// Returns the output directory, defaulting to `$HOME/.kraken`.
    #[must_use]
    pub fn output_dir_or_default<E: mockable::Env>(&self, env: &E) -> Utf8PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| home_dir(env).join(KRAKEN_DIR))
    }

    /// Returns the cluster configuration path, defaulting to
    /// `$HOME/.kraken/config.yaml`.
    #[must_use]
    pub fn cluster_config_or_default<E: mockable::Env>(&self, env: &E) -> Utf8PathBuf {
        self.cluster_config.clone().unwrap_or_else(|| {
            home_dir(env)
                .join(KRAKEN_DIR)
                .join(DEFAULT_CLUSTER_CONFIG)
        })
    }

    /// Checks values that cannot be expressed through types alone.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` when `run.timeout_secs` is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: String::from("run.timeout_secs"),
                reason: String::from("must be greater than zero"),
            });
        }
        Ok(())
    }
}

impl PostMergeHook for AppConfig {
    fn post_merge(&mut self, _ctx: &PostMergeContext) -> OrthoResult<()> {
        // Empty strings from flags or the environment mean "unset".
        for value in [
            &mut self.image,
            &mut self.docker.host,
            &mut self.docker.api_version,
            &mut self.registry.username,
            &mut self.registry.password,
        ] {
            if value.as_deref().is_some_and(|text| text.trim().is_empty()) {
                *value = None;
            }
        }
        Ok(())
    }
}

fn home_dir<E: mockable::Env>(env: &E) -> Utf8PathBuf {
    env.string("HOME")
        .filter(|home| !home.is_empty())
        .map_or_else(|| Utf8PathBuf::from("."), Utf8PathBuf::from)
}
