//! Container runtime capability used by the lifecycle manager.

use std::future::Future;
use std::pin::{Pin, pin};

use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse};
use bollard::query_parameters::{
    CreateContainerOptions, KillContainerOptionsBuilder, LogsOptionsBuilder,
    RemoveContainerOptionsBuilder, RenameContainerOptionsBuilder, StartContainerOptions,
    WaitContainerOptions,
};
use bollard::Docker;
use futures_util::{Stream, StreamExt};

/// Boxed future type returned by [`ContainerRuntime`] operations.
pub type RuntimeFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, BollardError>> + Send + 'a>>;

/// Boxed log stream returned by [`ContainerRuntime::logs`].
pub type LogStream<'a> = Pin<Box<dyn Stream<Item = Result<LogOutput, BollardError>> + Send + 'a>>;

/// Signal delivered when a timed-out container is preserved.
const KILL_SIGNAL: &str = "KILL";

/// Container operations needed to run a single task.
///
/// Implemented for [`Docker`]; tests substitute a mock so lifecycle and
/// cleanup rules can be exercised without a daemon.
pub trait ContainerRuntime {
    /// Create a container.
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        body: ContainerCreateBody,
    ) -> RuntimeFuture<'_, ContainerCreateResponse>;

    /// Start a created container.
    fn start_container(&self, container_id: &str) -> RuntimeFuture<'_, ()>;

    /// Wait for the container to exit and return its status code.
    fn wait_container(&self, container_id: &str) -> RuntimeFuture<'_, i64>;

    /// Stream stdout and stderr, following new output when `follow` is set.
    fn logs(&self, container_id: &str, follow: bool) -> LogStream<'_>;

    /// Send `SIGKILL` to the container.
    fn kill_container(&self, container_id: &str) -> RuntimeFuture<'_, ()>;

    /// Remove the container, killing it first when `force` is set.
    fn remove_container(&self, container_id: &str, force: bool) -> RuntimeFuture<'_, ()>;

    /// Give the container a new name.
    fn rename_container(&self, container_id: &str, new_name: &str) -> RuntimeFuture<'_, ()>;
}

impl ContainerRuntime for Docker {
    fn create_container(
        &self,
        options: Option<CreateContainerOptions>,
        body: ContainerCreateBody,
    ) -> RuntimeFuture<'_, ContainerCreateResponse> {
        Box::pin(async move { Self::create_container(self, options, body).await })
    }

    fn start_container(&self, container_id: &str) -> RuntimeFuture<'_, ()> {
        let id = String::from(container_id);
        Box::pin(async move { Self::start_container(self, &id, None::<StartContainerOptions>).await })
    }

    fn wait_container(&self, container_id: &str) -> RuntimeFuture<'_, i64> {
        let id = String::from(container_id);
        Box::pin(async move {
            let mut responses = pin!(Self::wait_container(
                self,
                &id,
                None::<WaitContainerOptions>
            ));
            match responses.next().await {
                Some(Ok(response)) => Ok(response.status_code),
                // The engine reports non-zero exits as wait errors.
                Some(Err(BollardError::DockerContainerWaitError { code, .. })) => Ok(code),
                Some(Err(error)) => Err(error),
                None => Err(BollardError::IOError {
                    err: std::io::Error::new(
                        std::io::ErrorKind::UnexpectedEof,
                        "wait stream ended without an exit status",
                    ),
                }),
            }
        })
    }

    fn logs(&self, container_id: &str, follow: bool) -> LogStream<'_> {
        let options = LogsOptionsBuilder::new()
            .stdout(true)
            .stderr(true)
            .follow(follow)
            .build();
        Box::pin(Self::logs(self, container_id, Some(options)))
    }

    fn kill_container(&self, container_id: &str) -> RuntimeFuture<'_, ()> {
        let id = String::from(container_id);
        let options = KillContainerOptionsBuilder::new().signal(KILL_SIGNAL).build();
        Box::pin(async move { Self::kill_container(self, &id, Some(options)).await })
    }

    fn remove_container(&self, container_id: &str, force: bool) -> RuntimeFuture<'_, ()> {
        let id = String::from(container_id);
        let options = RemoveContainerOptionsBuilder::new().force(force).build();
        Box::pin(async move { Self::remove_container(self, &id, Some(options)).await })
    }

    fn rename_container(&self, container_id: &str, new_name: &str) -> RuntimeFuture<'_, ()> {
        let id = String::from(container_id);
        let options = RenameContainerOptionsBuilder::new().name(new_name).build();
        Box::pin(async move { Self::rename_container(self, &id, options).await })
    }
}
