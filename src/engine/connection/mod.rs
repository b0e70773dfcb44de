//! Runtime client construction from a resolved connection profile.
//!
//! The profile has already decided between the ambient environment-based
//! client and an explicit transport. This module only maps that decision
//! onto the matching `bollard` constructor.

mod error_classification;
mod health_check;
mod insecure_tls;

use bollard::Docker;
use bollard::errors::Error as BollardError;
use http::header::{HeaderValue, USER_AGENT};
use tracing::{debug, warn};

use crate::engine::profile::{EffectiveProfile, Transport};
use crate::error::{ConfigError, K2Error};

use error_classification::classify_connection_error;

/// Connection timeout in seconds for engine API requests.
const CONNECTION_TIMEOUT_SECS: u64 = 120;

/// Timeout in seconds for the post-connect ping.
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 10;

/// Classifies plain endpoints for connection handling.
#[derive(Debug, PartialEq, Eq)]
enum SocketType {
    /// Unix socket or Windows named pipe with explicit scheme.
    Socket,
    /// HTTP, HTTPS, or TCP endpoint (TCP is rewritten to HTTP).
    Http,
    /// Bare path without scheme prefix.
    BarePath,
}

impl SocketType {
    fn classify(host: &str) -> Self {
        if host.starts_with("unix://") || host.starts_with("npipe://") {
            Self::Socket
        } else if ["tcp://", "http://", "https://"]
            .iter()
            .any(|scheme| host.starts_with(scheme))
        {
            Self::Http
        } else {
            Self::BarePath
        }
    }
}

/// How a TLS transport treats the engine's certificate.
#[derive(Debug, PartialEq, Eq)]
enum TlsMode {
    /// Verify the engine against the configured CA.
    Verified,
    /// Accept any engine certificate.
    Unverified,
}

impl TlsMode {
    const fn select(insecure_skip_verify: bool) -> Self {
        if insecure_skip_verify {
            Self::Unverified
        } else {
            Self::Verified
        }
    }
}

/// Builds runtime clients from effective profiles.
pub struct EngineConnector;

impl EngineConnector {
    /// Build a runtime client for `profile`.
    ///
    /// No request is sent; `bollard` connects lazily. Use
    /// [`Self::connect_and_verify`] to confirm the engine responds.
    ///
    /// Plain endpoints accept `unix://`, `npipe://`, `tcp://` (rewritten to
    /// `http://`), `http://`, `https://` and bare socket paths. Every request
    /// carries the profile's user agent.
    ///
    /// # Errors
    ///
    /// Returns `ContainerError::ConnectionFailed`, `SocketNotFound` or
    /// `PermissionDenied` when the client cannot be constructed,
    /// `ConfigError::TlsMaterial` when unverified TLS cannot parse the client
    /// certificate, and `ConfigError::InvalidValue` when the user agent is
    /// not a valid header value.
    pub fn connect(profile: &EffectiveProfile) -> Result<Docker, K2Error> {
        let version = profile.api_version.to_client_version();
        let endpoint = Self::endpoint(profile).unwrap_or_default();
        let classify =
            |error: BollardError| K2Error::from(classify_connection_error(&error, endpoint));
        debug!(
            user_agent = %profile.user_agent,
            api_version = %profile.api_version,
            "building engine client"
        );

        let docker = match &profile.transport {
            Transport::Ambient => Docker::connect_with_defaults().map_err(classify)?,
            Transport::Plain { host } => match SocketType::classify(host) {
                SocketType::Socket => {
                    Docker::connect_with_socket(host, CONNECTION_TIMEOUT_SECS, &version)
                }
                SocketType::Http => Docker::connect_with_http(
                    &host.replacen("tcp://", "http://", 1),
                    CONNECTION_TIMEOUT_SECS,
                    &version,
                ),
                SocketType::BarePath => Docker::connect_with_socket(
                    &Self::normalize_bare_path(host),
                    CONNECTION_TIMEOUT_SECS,
                    &version,
                ),
            }
            .map_err(classify)?,
            Transport::Tls {
                host,
                material,
                insecure_skip_verify,
            } => match TlsMode::select(*insecure_skip_verify) {
                TlsMode::Verified => Docker::connect_with_ssl(
                    host,
                    material.key().as_std_path(),
                    material.cert().as_std_path(),
                    material.ca_cert().as_std_path(),
                    CONNECTION_TIMEOUT_SECS,
                    &version,
                )
                .map_err(classify)?,
                TlsMode::Unverified => {
                    warn!(host = %host, "engine certificate will not be verified");
                    insecure_tls::connect(host, material, CONNECTION_TIMEOUT_SECS, &version)?
                }
            },
        };

        let user_agent = Self::user_agent_header(&profile.user_agent)?;
        Ok(docker.with_request_modifier(move |mut request| {
            request.headers_mut().insert(USER_AGENT, user_agent.clone());
            request
        }))
    }

    fn user_agent_header(user_agent: &str) -> Result<HeaderValue, K2Error> {
        HeaderValue::from_str(user_agent).map_err(|error| {
            K2Error::from(ConfigError::InvalidValue {
                field: String::from("docker.api_version"),
                reason: format!("'{user_agent}' is not a valid user agent: {error}"),
            })
        })
    }

    /// Return the explicit endpoint of `profile`, if it names one.
    #[must_use]
    pub fn endpoint(profile: &EffectiveProfile) -> Option<&str> {
        match &profile.transport {
            Transport::Ambient => None,
            Transport::Plain { host } | Transport::Tls { host, .. } => Some(host),
        }
    }

    /// Prefix a bare path with `npipe://` when it looks like a named pipe
    /// (`\\` or `//`), otherwise with `unix://`.
    fn normalize_bare_path(path: &str) -> String {
        if path.starts_with("\\\\") || path.starts_with("//") {
            format!("npipe://{path}")
        } else {
            format!("unix://{path}")
        }
    }
}
