//! Structural walk of a cluster configuration for host files and variables.
//!
//! Cluster configurations reference host-side files (SSH keys, credential
//! bundles) by absolute path and secrets by `$VAR` placeholders. The walk
//! visits every scalar regardless of key names, so new configuration keys need
//! no code changes here.

use camino::Utf8Path;
use tracing::debug;

use super::bindings::{EnvOverride, EnvOverrides, MountSet, MountSpec};
use super::expand::{expand, referenced_variables};
use super::node::ConfigNode;
use crate::error::ConfigError;

/// Maximum nesting depth visited before the walk is rejected.
pub const MAX_WALK_DEPTH: usize = 64;

/// Mounts and overrides derived from a configuration tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedBindings {
    /// Baseline mounts followed by every discovered host path.
    pub mounts: MountSet,
    /// Every `$NAME` reference with its current value.
    pub env: EnvOverrides,
}

/// Derive bind mounts and environment overrides from `root`.
///
/// Every string scalar is inspected twice. Each `$NAME` reference produces an
/// [`EnvOverride`] carrying the variable's current value (empty when unset).
/// The string is then expanded and, when the expansion is an absolute path
/// that exists on the host, mounted at the same path inside the container.
/// Mounts already present in `base_mounts` or found earlier are not repeated.
///
/// # Errors
///
/// Returns `ConfigError::InvalidValue` when the tree nests deeper than
/// [`MAX_WALK_DEPTH`].
pub fn derive_mounts_and_env<E: mockable::Env>(
    root: &ConfigNode,
    base_mounts: MountSet,
    env: &E,
) -> Result<DerivedBindings, ConfigError> {
    let mut walker = Walker {
        env,
        derived: DerivedBindings {
            mounts: base_mounts,
            env: EnvOverrides::new(),
        },
    };
    walker.visit(root, 0)?;
    Ok(walker.derived)
}

struct Walker<'a, E: mockable::Env> {
    env: &'a E,
    derived: DerivedBindings,
}

impl<E: mockable::Env> Walker<'_, E> {
    fn visit(&mut self, node: &ConfigNode, depth: usize) -> Result<(), ConfigError> {
        if depth > MAX_WALK_DEPTH {
            return Err(ConfigError::InvalidValue {
                field: String::from("deployment"),
                reason: format!("configuration nests deeper than {MAX_WALK_DEPTH} levels"),
            });
        }

        match node {
            ConfigNode::Absent
            | ConfigNode::Bool(_)
            | ConfigNode::Integer(_)
            | ConfigNode::Float(_) => Ok(()),
            ConfigNode::Boxed(inner) => self.visit(inner, depth + 1),
            ConfigNode::Mapping(entries) => entries
                .iter()
                .try_for_each(|(_, value)| self.visit(value, depth + 1)),
            ConfigNode::Sequence(items) => items
                .iter()
                .try_for_each(|item| self.visit(item, depth + 1)),
            ConfigNode::String(text) => {
                self.record_references(text);
                self.record_mount(text);
                Ok(())
            }
        }
    }

    fn record_references(&mut self, text: &str) {
        for name in referenced_variables(text) {
            let value = self.env.string(name).unwrap_or_default();
            self.derived.env.insert(EnvOverride::new(name, value));
        }
    }

    fn record_mount(&mut self, text: &str) {
        let expanded = expand(text, self.env);
        let path = Utf8Path::new(&expanded);
        if !path.is_absolute() || !path.exists() {
            return;
        }
        if self.derived.mounts.insert(MountSpec::identity(path)) {
            debug!(path = %path, "mounting host path referenced by cluster configuration");
        }
    }
}
