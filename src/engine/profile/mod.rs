//! Container engine client profile resolution.
//!
//! A profile starts from the `DOCKER_*` environment defaults and is then
//! overlaid with explicit settings. When the result is indistinguishable from
//! the environment defaults, the runtime client builds its own connection
//! from the environment ([`Transport::Ambient`]). Otherwise an explicit
//! transport is produced, TLS-secured when certificate material is present.

mod tls;

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::config::DockerConfig;
use crate::error::ConfigError;

pub use tls::TlsMaterial;

/// Engine endpoint used when `DOCKER_HOST` is unset.
pub const DEFAULT_DOCKER_HOST: &str = "unix:///var/run/docker.sock";

/// Prefix of the user agent sent to the engine.
const USER_AGENT_PREFIX: &str = "engine-api-cli-";

const CA_FILE: &str = "ca.pem";
const CERT_FILE: &str = "cert.pem";
const KEY_FILE: &str = "key.pem";

/// Engine API version as `MAJOR.MINOR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiVersion {
    /// Major version.
    pub major: usize,
    /// Minor version.
    pub minor: usize,
}

impl ApiVersion {
    /// The version the runtime client speaks by default.
    #[must_use]
    pub const fn client_default() -> Self {
        Self {
            major: bollard::API_DEFAULT_VERSION.major_version,
            minor: bollard::API_DEFAULT_VERSION.minor_version,
        }
    }

    /// Parse a `MAJOR.MINOR` string.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` for anything other than two
    /// dot-separated unsigned integers.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            field: String::from("docker.api_version"),
            reason: format!("expected MAJOR.MINOR, got '{raw}'"),
        };
        let (major, minor) = raw.trim().split_once('.').ok_or_else(invalid)?;
        Ok(Self {
            major: major.parse().map_err(|_| invalid())?,
            minor: minor.parse().map_err(|_| invalid())?,
        })
    }

    /// Convert to the runtime client's version type.
    #[must_use]
    pub const fn to_client_version(self) -> bollard::ClientVersion {
        bollard::ClientVersion {
            major_version: self.major,
            minor_version: self.minor,
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Connection parameters before the ambient or explicit decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientProfile {
    host: String,
    api_version: String,
    tls_enabled: bool,
    tls_verify: bool,
    ca_cert_path: Utf8PathBuf,
    cert_path: Utf8PathBuf,
    key_path: Utf8PathBuf,
}

impl ClientProfile {
    /// Build the profile implied by the `DOCKER_*` environment variables.
    ///
    /// `DOCKER_TLS_VERIFY` counts as set unless it is empty or `0`. The
    /// certificate directory comes from `DOCKER_CERT_PATH`, falling back to
    /// `$HOME/.docker`. An unset `HOME` expands to nothing, giving `/.docker`.
    #[must_use]
    pub fn from_environment<E: mockable::Env>(env: &E) -> Self {
        let non_empty = |name: &str| env.string(name).filter(|value| !value.is_empty());

        let tls_verify = non_empty("DOCKER_TLS_VERIFY").is_some_and(|value| value != "0");
        let cert_dir = non_empty("DOCKER_CERT_PATH").map_or_else(
            || {
                non_empty("HOME")
                    .map_or_else(|| Utf8PathBuf::from("/"), Utf8PathBuf::from)
                    .join(".docker")
            },
            Utf8PathBuf::from,
        );

        Self {
            host: non_empty("DOCKER_HOST").unwrap_or_else(|| String::from(DEFAULT_DOCKER_HOST)),
            api_version: non_empty("DOCKER_API_VERSION")
                .unwrap_or_else(|| ApiVersion::client_default().to_string()),
            tls_enabled: tls_verify,
            tls_verify,
            ca_cert_path: cert_dir.join(CA_FILE),
            cert_path: cert_dir.join(CERT_FILE),
            key_path: cert_dir.join(KEY_FILE),
        }
    }

    /// Overlay explicitly configured values.
    #[must_use]
    pub fn with_overrides(mut self, explicit: &DockerConfig) -> Self {
        if let Some(host) = &explicit.host {
            self.host.clone_from(host);
        }
        if let Some(version) = &explicit.api_version {
            self.api_version.clone_from(version);
        }
        if let Some(tls) = explicit.tls {
            self.tls_enabled = tls;
        }
        if let Some(verify) = explicit.tls_verify {
            self.tls_verify = verify;
        }
        if let Some(path) = &explicit.tls_ca_cert {
            self.ca_cert_path.clone_from(path);
        }
        if let Some(path) = &explicit.tls_cert {
            self.cert_path.clone_from(path);
        }
        if let Some(path) = &explicit.tls_key {
            self.key_path.clone_from(path);
        }
        self
    }

    /// Return the engine endpoint.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Return the requested API version string.
    #[must_use]
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Return the CA certificate path.
    #[must_use]
    pub fn ca_cert_path(&self) -> &Utf8Path {
        &self.ca_cert_path
    }

    /// Return the client certificate path.
    #[must_use]
    pub fn cert_path(&self) -> &Utf8Path {
        &self.cert_path
    }

    /// Return the client key path.
    #[must_use]
    pub fn key_path(&self) -> &Utf8Path {
        &self.key_path
    }

    /// Whether this profile carries the same connection settings as
    /// `defaults`.
    ///
    /// `tls_enabled` is not compared: ambient construction derives it from
    /// the verify flag.
    #[must_use]
    pub fn matches_environment(&self, defaults: &Self) -> bool {
        self.api_version == defaults.api_version
            && self.host == defaults.host
            && self.tls_verify == defaults.tls_verify
            && self.ca_cert_path == defaults.ca_cert_path
            && self.cert_path == defaults.cert_path
            && self.key_path == defaults.key_path
    }

    /// Whether TLS is requested and all three certificate files exist.
    #[must_use]
    pub fn is_tls_activated(&self) -> bool {
        (self.tls_enabled || self.tls_verify)
            && self.ca_cert_path.exists()
            && self.cert_path.exists()
            && self.key_path.exists()
    }
}

/// How the runtime client reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transport {
    /// Let the runtime client configure itself from the environment.
    Ambient,
    /// Unencrypted connection to `host`.
    Plain {
        /// Engine endpoint.
        host: String,
    },
    /// TLS connection to `host`.
    Tls {
        /// Engine endpoint.
        host: String,
        /// Validated certificate material.
        material: TlsMaterial,
        /// Skip verification of the engine's certificate.
        insecure_skip_verify: bool,
    },
}

/// Fully resolved connection parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveProfile {
    /// Transport selection.
    pub transport: Transport,
    /// API version to speak.
    pub api_version: ApiVersion,
    /// User agent identifying this client.
    pub user_agent: String,
}

/// Resolve the effective connection profile.
///
/// Resolution reads the environment and the filesystem only, so repeated
/// calls with the same inputs yield the same profile.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when the API version is not
/// `MAJOR.MINOR`, and `ConfigError::TlsMaterial` when TLS is activated but a
/// certificate or key cannot be read or is malformed.
pub fn resolve<E: mockable::Env>(
    explicit: &DockerConfig,
    env: &E,
) -> Result<EffectiveProfile, ConfigError> {
    let defaults = ClientProfile::from_environment(env);
    let profile = defaults.clone().with_overrides(explicit);
    let api_version = ApiVersion::parse(profile.api_version())?;
    let user_agent = format!("{USER_AGENT_PREFIX}{}", profile.api_version());

    // The runtime client's ambient construction always speaks its own
    // default version, so a pinned `DOCKER_API_VERSION` needs the explicit
    // transport built from the same environment values.
    let transport = if profile.matches_environment(&defaults)
        && api_version == ApiVersion::client_default()
    {
        Transport::Ambient
    } else if profile.is_tls_activated() {
        Transport::Tls {
            host: profile.host.clone(),
            material: TlsMaterial::load(
                &profile.ca_cert_path,
                &profile.cert_path,
                &profile.key_path,
            )?,
            insecure_skip_verify: !profile.tls_verify,
        }
    } else {
        Transport::Plain {
            host: profile.host.clone(),
        }
    };

    debug!(
        host = profile.host(),
        api_version = %api_version,
        transport = transport_label(&transport),
        "resolved engine client profile"
    );

    Ok(EffectiveProfile {
        transport,
        api_version,
        user_agent,
    })
}

const fn transport_label(transport: &Transport) -> &'static str {
    match transport {
        Transport::Ambient => "ambient",
        Transport::Plain { .. } => "plain",
        Transport::Tls { .. } => "tls",
    }
}
