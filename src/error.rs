//! Semantic error types for the k2cli application.
//!
//! This module defines the error hierarchy for k2cli, following the principle of
//! using semantic error enums (via `thiserror`) for conditions the caller might
//! inspect or map to an exit status, while reserving opaque errors
//! (`eyre::Report`) for the application boundary.
//!
//! A timed-out task is not an error: it is reported as
//! [`RunOutcome::TimedOut`](crate::engine::RunOutcome::TimedOut) so the caller
//! can run the timeout cleanup path. A container that exits non-zero is not an
//! error either.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur during configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found at the expected path.
    #[error("configuration file not found: {path}")]
    FileNotFound {
        /// The path where the configuration file was expected.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file: {message}")]
    ParseError {
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value is missing.
    #[error("missing required configuration: {field}")]
    MissingRequired {
        /// The name of the missing field.
        field: String,
    },

    /// A configuration value failed validation.
    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue {
        /// The name of the invalid field.
        field: String,
        /// The reason the value is invalid.
        reason: String,
    },

    /// TLS material required by the connection profile could not be loaded.
    #[error("failed to load TLS material from '{path}': {message}")]
    TlsMaterial {
        /// The certificate or key path.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The logging subscriber could not be installed.
    #[error("failed to initialise logging: {message}")]
    LoggingInit {
        /// A description of the failure.
        message: String,
    },

    /// The `OrthoConfig` library returned an error during configuration loading.
    #[error("configuration loading failed: {0}")]
    OrthoConfig(Arc<ortho_config::OrthoError>),
}

/// A post-run cleanup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupStep {
    /// Removing the container.
    Remove,
    /// Killing the container.
    Kill,
    /// Renaming the container.
    Rename,
}

impl fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Remove => "remove",
            Self::Kill => "kill",
            Self::Rename => "rename",
        };
        f.write_str(label)
    }
}

/// Errors that can occur during container operations.
#[derive(Debug, Error)]
pub enum ContainerError {
    /// Failed to connect to the container engine.
    #[error("failed to connect to container engine: {message}")]
    ConnectionFailed {
        /// A description of the connection failure.
        message: String,
    },

    /// The container engine socket was not found.
    #[error("container engine socket not found: {path}")]
    SocketNotFound {
        /// The path where the socket was expected.
        path: PathBuf,
    },

    /// Permission denied when accessing the container engine socket.
    #[error("permission denied accessing container socket: {path}")]
    PermissionDenied {
        /// The path to the socket.
        path: PathBuf,
    },

    /// Health check failed - engine did not respond correctly.
    #[error("container engine health check failed: {message}")]
    HealthCheckFailed {
        /// A description of the health check failure.
        message: String,
    },

    /// Health check timed out.
    #[error("container engine health check timed out after {seconds} seconds")]
    HealthCheckTimeout {
        /// The timeout duration in seconds.
        seconds: u64,
    },

    /// Failed to pull the task image.
    #[error("failed to pull image '{image}': {message}")]
    PullFailed {
        /// The image reference.
        image: String,
        /// The engine's error message, verbatim.
        message: String,
    },

    /// Failed to create a container.
    #[error("failed to create container '{name}': {message}")]
    CreateFailed {
        /// The requested container name.
        name: String,
        /// A description of the creation failure.
        message: String,
    },

    /// Failed to start a container.
    #[error("failed to start container '{container_id}': {message}")]
    StartFailed {
        /// The ID of the container that failed to start.
        container_id: String,
        /// A description of the start failure.
        message: String,
    },

    /// Waiting for the container to exit failed.
    #[error("failed waiting for container '{container_id}': {message}")]
    WaitFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the failure.
        message: String,
    },

    /// Fetching container logs failed.
    #[error("failed to fetch logs for container '{container_id}': {message}")]
    LogsFailed {
        /// The ID of the container.
        container_id: String,
        /// A description of the failure.
        message: String,
    },

    /// A post-run cleanup step failed. The container may be orphaned.
    #[error("failed to {step} container '{container_id}': {message}")]
    CleanupFailed {
        /// The ID of the container.
        container_id: String,
        /// The step that failed.
        step: CleanupStep,
        /// A description of the failure.
        message: String,
    },
}

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FilesystemError {
    /// A file or directory was not found.
    #[error("path not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Permission denied when accessing a path.
    #[error("permission denied: {path}")]
    PermissionDenied {
        /// The path that could not be accessed.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("I/O error at '{path}': {message}")]
    IoError {
        /// The path where the error occurred.
        path: PathBuf,
        /// A description of the I/O error.
        message: String,
    },
}

impl FilesystemError {
    /// Classify an I/O error raised at `path`.
    #[must_use]
    pub fn from_io(path: impl Into<PathBuf>, error: &std::io::Error) -> Self {
        let path_buf = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path: path_buf },
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path: path_buf },
            _ => Self::IoError {
                path: path_buf,
                message: error.to_string(),
            },
        }
    }
}

/// Top-level error type for the k2cli application.
///
/// This enum aggregates all domain-specific errors into a single type that can
/// be used throughout the application. At the application boundary (main.rs),
/// these errors are converted to `eyre::Report` for human-readable reporting.
#[derive(Debug, Error)]
pub enum K2Error {
    /// An error occurred during configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An error occurred during container operations.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// An error occurred during filesystem operations.
    #[error(transparent)]
    Filesystem(#[from] FilesystemError),
}

impl K2Error {
    /// Returns whether this error came from post-run cleanup.
    #[must_use]
    pub const fn is_cleanup_failure(&self) -> bool {
        matches!(self, Self::Container(ContainerError::CleanupFailed { .. }))
    }
}

/// A specialised `Result` type for k2cli operations.
pub type Result<T> = std::result::Result<T, K2Error>;
