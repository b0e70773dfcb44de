//! Loading of YAML cluster configuration documents.

use std::path::PathBuf;

use camino::{Utf8Path, Utf8PathBuf};
use cap_std::ambient_authority;
use cap_std::fs_utf8::Dir;

use super::expand::expand;
use super::node::ConfigNode;
use crate::error::ConfigError;

/// Dotted path of the first cluster's name.
pub const CLUSTER_NAME_PATH: &str = "deployment.clusters.0.name";

/// Placeholder used when the configuration does not name a cluster.
pub const MISSING_CLUSTER_NAME: &str = "cluster-name-missing";

/// Read and parse the cluster configuration at `path`.
///
/// Files are read through `cap_std::fs_utf8` by opening the parent directory
/// with ambient authority.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` when the file or its directory does
/// not exist, and `ConfigError::ParseError` when it cannot be read or is not
/// valid YAML.
pub fn load_cluster_config(path: &Utf8Path) -> Result<ConfigNode, ConfigError> {
    let current_dir = Utf8PathBuf::from(".");
    let parent = path
        .parent()
        .filter(|dir| !dir.as_str().is_empty())
        .unwrap_or_else(|| current_dir.as_ref());
    let file_name = path.file_name().ok_or_else(|| ConfigError::InvalidValue {
        field: String::from("config"),
        reason: format!("'{path}' does not name a file"),
    })?;

    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .map_err(|error| read_error(path, &error))?;
    let content = dir
        .read_to_string(file_name)
        .map_err(|error| read_error(path, &error))?;

    parse_cluster_config(&content).map_err(|error| ConfigError::ParseError {
        message: format!("failed to parse {path}: {error}"),
    })
}

/// Parse a cluster configuration document held in memory.
///
/// An empty document yields [`ConfigNode::Absent`].
///
/// # Errors
///
/// Returns the YAML error when `content` is not valid YAML.
pub fn parse_cluster_config(content: &str) -> Result<ConfigNode, serde_yaml::Error> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    Ok(ConfigNode::from(value))
}

/// Return the environment-expanded name of the first declared cluster.
///
/// Falls back to [`MISSING_CLUSTER_NAME`] when the name is missing, not a
/// string, or expands to nothing.
#[must_use]
pub fn cluster_name<E: mockable::Env>(tree: &ConfigNode, env: &E) -> String {
    tree.lookup(CLUSTER_NAME_PATH)
        .and_then(ConfigNode::as_str)
        .map(|name| expand(name, env))
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| String::from(MISSING_CLUSTER_NAME))
}

fn read_error(path: &Utf8Path, error: &std::io::Error) -> ConfigError {
    if error.kind() == std::io::ErrorKind::NotFound {
        ConfigError::FileNotFound {
            path: PathBuf::from(path.as_std_path()),
        }
    } else {
        ConfigError::ParseError {
            message: format!("failed to read {path}: {error}"),
        }
    }
}
