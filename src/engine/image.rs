//! Task image pull with optional registry credentials.
//!
//! The engine API has no separate login step for pulls; credentials travel
//! with the pull request itself.

use std::future::Future;
use std::pin::Pin;

use bollard::Docker;
use bollard::auth::DockerCredentials;
use bollard::errors::Error as BollardError;
use bollard::query_parameters::CreateImageOptionsBuilder;
use futures_util::{TryStreamExt, future};
use tracing::{debug, info};

use crate::config::RegistryConfig;
use crate::error::{ContainerError, K2Error};

/// Registry assumed when the image reference names none.
pub const DEFAULT_REGISTRY: &str = "index.docker.io";

const DEFAULT_TAG: &str = "latest";

/// Boxed future type returned by [`ImagePuller::pull_image`].
pub type PullFuture<'a> = Pin<Box<dyn Future<Output = Result<(), BollardError>> + Send + 'a>>;

/// Behaviour required to pull an image to completion.
pub trait ImagePuller {
    /// Pull `repository` at `tag`, draining the progress stream.
    fn pull_image(
        &self,
        repository: &str,
        tag: &str,
        credentials: Option<DockerCredentials>,
    ) -> PullFuture<'_>;
}

impl ImagePuller for Docker {
    fn pull_image(
        &self,
        repository: &str,
        tag: &str,
        credentials: Option<DockerCredentials>,
    ) -> PullFuture<'_> {
        let options = CreateImageOptionsBuilder::new()
            .from_image(repository)
            .tag(tag)
            .build();
        let progress = Self::create_image(self, Some(options), None, credentials);
        Box::pin(async move { progress.try_for_each(|_| future::ready(Ok(()))).await })
    }
}

/// Split an image reference into repository and tag.
///
/// Digests (`repo@sha256:...`) are kept as the tag. A colon only starts a tag
/// after the last `/`, so registry ports survive. Untagged references get
/// `latest`.
#[must_use]
pub fn split_image_reference(image: &str) -> (&str, &str) {
    if let Some((repository, digest)) = image.split_once('@') {
        return (repository, digest);
    }

    let name_start = image.rfind('/').map_or(0, |slash| slash + 1);
    match image.rfind(':') {
        Some(colon) if colon >= name_start => {
            let (repository, tag) = image.split_at(colon);
            (repository, tag.trim_start_matches(':'))
        }
        _ => (image, DEFAULT_TAG),
    }
}

/// Return the registry host for `image`.
///
/// The first path segment names a registry only when the reference has more
/// than one segment and that segment contains a dot.
#[must_use]
pub fn registry_server_address(image: &str) -> &str {
    image
        .split_once('/')
        .map(|(first, _)| first)
        .filter(|first| first.contains('.'))
        .unwrap_or(DEFAULT_REGISTRY)
}

/// Build pull credentials for `image` when both user and password are set.
#[must_use]
pub fn registry_credentials(image: &str, registry: &RegistryConfig) -> Option<DockerCredentials> {
    registry
        .credentials()
        .map(|(username, password)| DockerCredentials {
            username: Some(String::from(username)),
            password: Some(String::from(password)),
            serveraddress: Some(String::from(registry_server_address(image))),
            ..DockerCredentials::default()
        })
}

/// Pull `image`, authenticating with `registry` credentials when present.
///
/// # Errors
///
/// Returns `ContainerError::PullFailed` carrying the engine's message.
pub async fn pull<P: ImagePuller>(
    puller: &P,
    image: &str,
    registry: &RegistryConfig,
) -> Result<(), K2Error> {
    let (repository, tag) = split_image_reference(image);
    let credentials = registry_credentials(image, registry);
    debug!(
        repository,
        tag,
        authenticated = credentials.is_some(),
        "pulling task image"
    );

    puller
        .pull_image(repository, tag, credentials)
        .await
        .map_err(|error| ContainerError::PullFailed {
            image: String::from(image),
            message: engine_message(error),
        })?;

    info!(image, "task image ready");
    Ok(())
}

fn engine_message(error: BollardError) -> String {
    match error {
        BollardError::DockerStreamError { error: message }
        | BollardError::DockerResponseServerError { message, .. } => message,
        other => other.to_string(),
    }
}
