//! Bounded ping and connect-and-verify.

use std::time::Duration;

use bollard::Docker;

use super::{EngineConnector, HEALTH_CHECK_TIMEOUT_SECS};
use crate::engine::profile::EffectiveProfile;
use crate::error::{ContainerError, K2Error};

use super::error_classification::classify_connection_error;

impl EngineConnector {
    /// Ping the engine, giving up after the health check timeout.
    ///
    /// Socket and permission problems only surface here because the client
    /// connects lazily, so failures are classified against `endpoint`.
    pub(super) async fn ping_with_timeout(
        docker: &Docker,
        endpoint: &str,
    ) -> Result<(), K2Error> {
        let timeout = Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS);

        tokio::time::timeout(timeout, docker.ping())
            .await
            .map_err(|_| ContainerError::HealthCheckTimeout {
                seconds: HEALTH_CHECK_TIMEOUT_SECS,
            })?
            .map_err(|error| match classify_connection_error(&error, endpoint) {
                ContainerError::ConnectionFailed { message } => {
                    ContainerError::HealthCheckFailed { message }
                }
                classified => classified,
            })?;
        Ok(())
    }

    /// Connect to the engine described by `profile` and verify it responds.
    ///
    /// # Errors
    ///
    /// Returns the connection errors of [`Self::connect`], plus
    /// `ContainerError::HealthCheckFailed` or
    /// `ContainerError::HealthCheckTimeout` when the ping fails.
    pub async fn connect_and_verify(profile: &EffectiveProfile) -> Result<Docker, K2Error> {
        let docker = Self::connect(profile)?;
        Self::ping_with_timeout(&docker, Self::endpoint(profile).unwrap_or_default()).await?;
        Ok(docker)
    }
}
