//! Task container lifecycle: create, start, wait under a deadline, capture
//! output, then clean up.
//!
//! Every started container reaches exactly one [`RunOutcome`] and then passes
//! through cleanup. Cleanup depends on the outcome and on keep-alive:
//!
//! | Outcome   | keep-alive off | keep-alive on     |
//! |-----------|----------------|-------------------|
//! | Completed | remove         | rename            |
//! | TimedOut  | force-remove   | kill, then rename |
//! | Failed    | force-remove   | rename            |
//!
//! A cleanup failure is always returned as an error since it may leave an
//! orphaned container behind.

mod naming;
mod runtime;

use std::time::Duration;

use bollard::container::LogOutput;
use bollard::models::{ContainerCreateBody, HostConfig};
use bollard::query_parameters::CreateContainerOptionsBuilder;
use futures_util::StreamExt;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cluster::{EnvOverrides, MountSet};
use crate::error::{CleanupStep, ConfigError, ContainerError, K2Error};

pub use naming::{container_name, preserved_name};
pub use runtime::{ContainerRuntime, LogStream, RuntimeFuture};

/// Upper bound on how long live output is copied to the caller's writer.
pub const LIVE_LOG_TIMEOUT: Duration = Duration::from_secs(5);

/// A container to run once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRun {
    image: String,
    name: String,
    command: Vec<String>,
    env: Vec<String>,
    binds: Vec<String>,
}

impl TaskRun {
    /// Create a run of `image` under the container name `name`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when either value is blank.
    pub fn new(image: &str, name: &str) -> Result<Self, ConfigError> {
        let required = |field: &str, value: &str| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                Err(ConfigError::MissingRequired {
                    field: String::from(field),
                })
            } else {
                Ok(String::from(trimmed))
            }
        };

        Ok(Self {
            image: required("image", image)?,
            name: required("name", name)?,
            command: Vec::new(),
            env: Vec::new(),
            binds: Vec::new(),
        })
    }

    /// Set the command, given as `argv`.
    #[must_use]
    pub fn with_command(mut self, command: Vec<String>) -> Self {
        self.command = command;
        self
    }

    /// Set the container environment.
    #[must_use]
    pub fn with_env(mut self, env: &EnvOverrides) -> Self {
        self.env = env.entries();
        self
    }

    /// Set the bind mounts.
    #[must_use]
    pub fn with_mounts(mut self, mounts: &MountSet) -> Self {
        self.binds = mounts.binds();
        self
    }

    /// Return the image reference.
    #[must_use]
    pub fn image(&self) -> &str {
        &self.image
    }

    /// Return the container name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the command.
    #[must_use]
    pub fn command(&self) -> &[String] {
        &self.command
    }

    /// Return the `NAME=value` environment entries.
    #[must_use]
    pub fn env(&self) -> &[String] {
        &self.env
    }

    /// Return the `host:container` bind strings.
    #[must_use]
    pub fn binds(&self) -> &[String] {
        &self.binds
    }

    fn create_body(&self) -> ContainerCreateBody {
        ContainerCreateBody {
            image: Some(self.image.clone()),
            cmd: (!self.command.is_empty()).then(|| self.command.clone()),
            env: (!self.env.is_empty()).then(|| self.env.clone()),
            attach_stdout: Some(true),
            tty: Some(true),
            host_config: Some(HostConfig {
                binds: (!self.binds.is_empty()).then(|| self.binds.clone()),
                ..HostConfig::default()
            }),
            ..ContainerCreateBody::default()
        }
    }
}

/// Stand-in for a timeout too large to add to the current instant.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Deadline and preservation settings for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunPolicy {
    /// Instant after which the wait is abandoned.
    pub deadline: Instant,
    /// Preserve the container under a new name instead of removing it.
    pub keep_alive: bool,
}

impl RunPolicy {
    /// A policy whose deadline is `timeout` from now.
    ///
    /// A timeout past the clock's range yields a deadline thirty years out.
    #[must_use]
    pub fn from_timeout(timeout: Duration, keep_alive: bool) -> Self {
        let now = Instant::now();
        Self {
            deadline: now.checked_add(timeout).unwrap_or_else(|| now + FAR_FUTURE),
            keep_alive,
        }
    }
}

/// How a started container ended.
#[derive(Debug)]
pub enum RunOutcome {
    /// The container exited on its own.
    Completed {
        /// The container's exit status code.
        exit_code: i64,
    },
    /// The deadline passed before the container exited.
    TimedOut,
    /// The container could not be started or waited on.
    Failed(ContainerError),
}

impl RunOutcome {
    /// Whether the container exited with status zero.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Completed { exit_code: 0 })
    }

    /// Process exit status for this outcome.
    ///
    /// A non-zero container code is passed through when it fits a process
    /// status; timeouts, failures and out-of-range codes map to 1.
    #[must_use]
    pub fn exit_status(&self) -> u8 {
        match self {
            Self::Completed { exit_code: 0 } => 0,
            Self::Completed { exit_code } => u8::try_from(*exit_code)
                .ok()
                .filter(|code| *code != 0)
                .unwrap_or(1),
            Self::TimedOut | Self::Failed(_) => 1,
        }
    }
}

/// What cleanup did with the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupReport {
    /// The container was removed.
    Removed {
        /// Whether removal was forced.
        forced: bool,
    },
    /// The container was preserved under a new name.
    Renamed {
        /// The name before cleanup.
        from: String,
        /// The new name.
        to: String,
    },
    /// The container was killed, then preserved under a new name.
    KilledAndRenamed {
        /// The name before cleanup.
        from: String,
        /// The new name.
        to: String,
    },
}

impl CleanupReport {
    /// The preserved name, if the container was kept.
    #[must_use]
    pub fn preserved_as(&self) -> Option<&str> {
        match self {
            Self::Removed { .. } => None,
            Self::Renamed { to, .. } | Self::KilledAndRenamed { to, .. } => Some(to),
        }
    }
}

/// Result of a complete run.
#[derive(Debug)]
pub struct TaskReport {
    /// The engine-assigned container ID.
    pub container_id: String,
    /// How the container ended.
    pub outcome: RunOutcome,
    /// Captured stdout and stderr, or `None` when capture failed.
    pub output: Option<String>,
    /// What cleanup did.
    pub cleanup: CleanupReport,
}

/// Drives a [`TaskRun`] through its lifecycle on a [`ContainerRuntime`].
pub struct LifecycleManager<'a, R: ContainerRuntime> {
    runtime: &'a R,
}

impl<'a, R: ContainerRuntime> LifecycleManager<'a, R> {
    /// Create a manager backed by `runtime`.
    #[must_use]
    pub const fn new(runtime: &'a R) -> Self {
        Self { runtime }
    }

    /// Run `task` to an outcome and clean up.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CreateFailed` when the container cannot be
    /// created, and `ContainerError::CleanupFailed` when cleanup fails.
    /// Start and wait failures are reported as [`RunOutcome::Failed`].
    pub async fn run(&self, task: &TaskRun, policy: RunPolicy) -> Result<TaskReport, K2Error> {
        self.execute(task, policy, None::<&mut tokio::io::Sink>)
            .await
    }

    /// Like [`Self::run`], also copying live output to `live` while waiting.
    ///
    /// # Errors
    ///
    /// As [`Self::run`]. Failures writing to `live` are logged only.
    pub async fn run_streaming<W>(
        &self,
        task: &TaskRun,
        policy: RunPolicy,
        live: &mut W,
    ) -> Result<TaskReport, K2Error>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        self.execute(task, policy, Some(live)).await
    }

    async fn execute<W>(
        &self,
        task: &TaskRun,
        policy: RunPolicy,
        live: Option<&mut W>,
    ) -> Result<TaskReport, K2Error>
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let container_id = self.launch(task).await?;

        let outcome = match self.start(&container_id).await {
            Ok(()) => match live {
                Some(writer) => {
                    let (outcome, ()) = tokio::join!(
                        self.await_completion(&container_id, policy.deadline),
                        self.stream_logs(&container_id, writer)
                    );
                    outcome
                }
                None => self.await_completion(&container_id, policy.deadline).await,
            },
            Err(error) => RunOutcome::Failed(error),
        };

        let output = match self.capture_logs(&container_id).await {
            Ok(text) => Some(text),
            Err(error) => {
                warn!(container_id = %container_id, error = %error, "failed to capture task output");
                None
            }
        };

        let cleanup = self
            .cleanup(&container_id, task.name(), &outcome, policy.keep_alive)
            .await?;

        Ok(TaskReport {
            container_id,
            outcome,
            output,
            cleanup,
        })
    }

    /// Create the container and return its ID.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CreateFailed` with the engine's message.
    pub async fn launch(&self, task: &TaskRun) -> Result<String, K2Error> {
        let options = CreateContainerOptionsBuilder::new().name(task.name()).build();
        let response = self
            .runtime
            .create_container(Some(options), task.create_body())
            .await
            .map_err(|error| ContainerError::CreateFailed {
                name: String::from(task.name()),
                message: error.to_string(),
            })?;

        for warning in &response.warnings {
            warn!(container = task.name(), "engine warning: {warning}");
        }
        debug!(container = task.name(), container_id = %response.id, "created task container");
        Ok(response.id)
    }

    async fn start(&self, container_id: &str) -> Result<(), ContainerError> {
        self.runtime
            .start_container(container_id)
            .await
            .map_err(|error| ContainerError::StartFailed {
                container_id: String::from(container_id),
                message: error.to_string(),
            })
    }

    /// Wait for the container to exit, abandoning the wait at `deadline`.
    pub async fn await_completion(&self, container_id: &str, deadline: Instant) -> RunOutcome {
        match tokio::time::timeout_at(deadline, self.runtime.wait_container(container_id)).await {
            Ok(Ok(exit_code)) => {
                debug!(container_id, exit_code, "task container exited");
                RunOutcome::Completed { exit_code }
            }
            Ok(Err(error)) => RunOutcome::Failed(ContainerError::WaitFailed {
                container_id: String::from(container_id),
                message: error.to_string(),
            }),
            Err(_) => {
                warn!(container_id, "task container did not finish before the deadline");
                RunOutcome::TimedOut
            }
        }
    }

    /// Fetch everything the container has written so far.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::LogsFailed` when the log stream fails.
    pub async fn capture_logs(&self, container_id: &str) -> Result<String, ContainerError> {
        let mut stream = self.runtime.logs(container_id, false);
        let mut captured = Vec::new();
        while let Some(chunk) = stream.next().await {
            let output = chunk.map_err(|error| ContainerError::LogsFailed {
                container_id: String::from(container_id),
                message: error.to_string(),
            })?;
            captured.extend_from_slice(&output.into_bytes());
        }
        Ok(String::from_utf8_lossy(&captured).into_owned())
    }

    /// Copy followed output to `writer` for at most [`LIVE_LOG_TIMEOUT`].
    async fn stream_logs<W>(&self, container_id: &str, writer: &mut W)
    where
        W: AsyncWrite + Unpin + Send + ?Sized,
    {
        let copy = async {
            let mut stream = self.runtime.logs(container_id, true);
            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(LogOutput::StdIn { .. }) => continue,
                    Ok(output) => output.into_bytes(),
                    Err(error) => {
                        warn!(container_id, error = %error, "live output stream failed");
                        return;
                    }
                };
                if let Err(error) = writer.write_all(&bytes).await {
                    warn!(container_id, error = %error, "failed writing live output");
                    return;
                }
            }
        };

        if tokio::time::timeout(LIVE_LOG_TIMEOUT, copy).await.is_err() {
            debug!(container_id, "live output window closed");
        }
        if let Err(error) = writer.flush().await {
            warn!(container_id, error = %error, "failed flushing live output");
        }
    }

    /// Apply the cleanup policy for `outcome`.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::CleanupFailed` naming the step that failed.
    pub async fn cleanup(
        &self,
        container_id: &str,
        name: &str,
        outcome: &RunOutcome,
        keep_alive: bool,
    ) -> Result<CleanupReport, K2Error> {
        let report = match (outcome, keep_alive) {
            (RunOutcome::Completed { .. }, false) => {
                self.remove(container_id, false).await?;
                CleanupReport::Removed { forced: false }
            }
            (RunOutcome::TimedOut | RunOutcome::Failed(_), false) => {
                self.remove(container_id, true).await?;
                CleanupReport::Removed { forced: true }
            }
            (RunOutcome::TimedOut, true) => {
                self.runtime
                    .kill_container(container_id)
                    .await
                    .map_err(|error| cleanup_failed(container_id, CleanupStep::Kill, &error))?;
                let to = self.rename(container_id, name).await?;
                CleanupReport::KilledAndRenamed {
                    from: String::from(name),
                    to,
                }
            }
            (RunOutcome::Completed { .. } | RunOutcome::Failed(_), true) => {
                let to = self.rename(container_id, name).await?;
                CleanupReport::Renamed {
                    from: String::from(name),
                    to,
                }
            }
        };

        info!(container_id, cleanup = ?report, "cleaned up task container");
        Ok(report)
    }

    async fn remove(&self, container_id: &str, force: bool) -> Result<(), ContainerError> {
        self.runtime
            .remove_container(container_id, force)
            .await
            .map_err(|error| cleanup_failed(container_id, CleanupStep::Remove, &error))
    }

    async fn rename(&self, container_id: &str, current: &str) -> Result<String, ContainerError> {
        let new_name = preserved_name(current);
        self.runtime
            .rename_container(container_id, &new_name)
            .await
            .map_err(|error| cleanup_failed(container_id, CleanupStep::Rename, &error))?;
        Ok(new_name)
    }
}

fn cleanup_failed(
    container_id: &str,
    step: CleanupStep,
    error: &bollard::errors::Error,
) -> ContainerError {
    ContainerError::CleanupFailed {
        container_id: String::from(container_id),
        step,
        message: error.to_string(),
    }
}
