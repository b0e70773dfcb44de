//! Cluster configuration documents and the container bindings derived from
//! them.
//!
//! A cluster configuration is an open-ended YAML document. The task container
//! needs every host file it references mounted at the same path, and every
//! `$NAME` placeholder it uses available in its environment. This module
//! parses the document into a [`ConfigNode`] tree and walks it to produce a
//! [`MountSet`] and [`EnvOverrides`].

mod bindings;
mod expand;
mod loader;
mod node;
mod walker;

pub use bindings::{EnvOverride, EnvOverrides, MountSet, MountSpec};
pub use expand::{expand, referenced_variables};
pub use loader::{
    CLUSTER_NAME_PATH, MISSING_CLUSTER_NAME, cluster_name, load_cluster_config,
    parse_cluster_config,
};
pub use node::ConfigNode;
pub use walker::{DerivedBindings, MAX_WALK_DEPTH, derive_mounts_and_env};
