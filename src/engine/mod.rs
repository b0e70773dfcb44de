//! Container engine access: client profile resolution, connection, image
//! pull, and the task container lifecycle.
//!
//! The pieces are used in order: [`resolve`] a profile from the `DOCKER_*`
//! environment and explicit settings, [`EngineConnector::connect_and_verify`]
//! to it, [`pull`] the task image, then drive the container with a
//! [`LifecycleManager`].

mod connection;
mod image;
mod lifecycle;
mod profile;

pub use connection::EngineConnector;
pub use image::{
    DEFAULT_REGISTRY, ImagePuller, PullFuture, pull, registry_credentials,
    registry_server_address, split_image_reference,
};
pub use lifecycle::{
    CleanupReport, ContainerRuntime, LIVE_LOG_TIMEOUT, LifecycleManager, LogStream, RunOutcome,
    RunPolicy, RuntimeFuture, TaskReport, TaskRun, container_name, preserved_name,
};
pub use profile::{
    ApiVersion, ClientProfile, DEFAULT_DOCKER_HOST, EffectiveProfile, TlsMaterial, Transport,
    resolve,
};
