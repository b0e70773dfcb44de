//! Configuration system for k2cli.
//!
//! This module provides the configuration structures and CLI definitions for
//! k2cli. Configuration loading and precedence merging is handled by the
//! `ortho_config` crate: CLI flags override environment variables, which
//! override the settings file, which overrides defaults.
//!
//! The settings file is expected at `~/.config/k2cli/config.toml` by default.
//! It configures k2cli itself; the cluster configuration is a separate YAML
//! document.
//!
//! # Example Configuration
//!
//! ```toml
//! image = "quay.io/samsung_cnct/k2:latest"
//! output_dir = "/home/user/.kraken"
//!
//! [run]
//! timeout_secs = 1800
//! keep_alive = true
//! log_path = "/home/user/.kraken/last-run.log"
//!
//! [docker]
//! host = "tcp://10.0.0.5:2376"
//! tls_verify = true
//! tls_ca_cert = "/home/user/.docker/ca.pem"
//! tls_cert = "/home/user/.docker/cert.pem"
//! tls_key = "/home/user/.docker/key.pem"
//!
//! [registry]
//! username = "robot"
//!
//! [logging]
//! level = "k2cli=debug"
//! format = "json"
//! ```

mod cli;
mod loader;
mod types;

#[cfg(test)]
mod tests;

pub use cli::{Cli, ClusterCommand, Commands, UpArgs, UpdateArgs};
pub use loader::{env_var_names, load_config, load_config_with_env};
pub use types::{
    AppConfig, DEFAULT_IMAGE, DEFAULT_TIMEOUT_SECS, DockerConfig, LogFormat, LoggingConfig,
    RegistryConfig, RunConfig,
};
