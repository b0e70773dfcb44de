//! Bind mounts and environment overrides handed to the task container.

use camino::{Utf8Path, Utf8PathBuf};

/// A host path made visible inside the container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSpec {
    host_path: Utf8PathBuf,
    container_path: Utf8PathBuf,
}

impl MountSpec {
    /// Mount `host_path` at `container_path`.
    #[must_use]
    pub fn new(host_path: impl Into<Utf8PathBuf>, container_path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            host_path: host_path.into(),
            container_path: container_path.into(),
        }
    }

    /// Mount `path` at the same location inside the container.
    #[must_use]
    pub fn identity(path: impl Into<Utf8PathBuf>) -> Self {
        let host_path = path.into();
        Self {
            container_path: host_path.clone(),
            host_path,
        }
    }

    /// Return the host-side path.
    #[must_use]
    pub fn host_path(&self) -> &Utf8Path {
        &self.host_path
    }

    /// Return the container-side path.
    #[must_use]
    pub fn container_path(&self) -> &Utf8Path {
        &self.container_path
    }

    /// Render the engine bind string `host:container`.
    #[must_use]
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host_path, self.container_path)
    }
}

/// Insertion-ordered set of mounts, unique by bind string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MountSet {
    mounts: Vec<MountSpec>,
}

impl MountSet {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self { mounts: Vec::new() }
    }

    /// Add `mount` unless an identical bind is already present.
    ///
    /// Returns whether the mount was added.
    pub fn insert(&mut self, mount: MountSpec) -> bool {
        if self.contains_bind(&mount.bind()) {
            return false;
        }
        self.mounts.push(mount);
        true
    }

    /// Return whether `bind` (`host:container`) is present.
    #[must_use]
    pub fn contains_bind(&self, bind: &str) -> bool {
        self.mounts.iter().any(|mount| mount.bind() == bind)
    }

    /// Iterate mounts in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &MountSpec> {
        self.mounts.iter()
    }

    /// Return the number of mounts.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.mounts.len()
    }

    /// Return whether the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.mounts.is_empty()
    }

    /// Render every mount as an engine bind string.
    #[must_use]
    pub fn binds(&self) -> Vec<String> {
        self.mounts.iter().map(MountSpec::bind).collect()
    }
}

impl IntoIterator for MountSet {
    type Item = MountSpec;
    type IntoIter = std::vec::IntoIter<MountSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.mounts.into_iter()
    }
}

/// A variable referenced by the configuration and its current value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvOverride {
    name: String,
    value: String,
}

impl EnvOverride {
    /// Create an override.
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Return the variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the resolved value, possibly empty.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render as `NAME=value`.
    #[must_use]
    pub fn entry(&self) -> String {
        format!("{}={}", self.name, self.value)
    }
}

/// Insertion-ordered set of environment overrides, unique by pair.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    overrides: Vec<EnvOverride>,
}

impl EnvOverrides {
    /// Create an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            overrides: Vec::new(),
        }
    }

    /// Add `entry` unless the identical pair is already present.
    pub fn insert(&mut self, entry: EnvOverride) -> bool {
        if self.overrides.contains(&entry) {
            return false;
        }
        self.overrides.push(entry);
        true
    }

    /// Look up the first value recorded for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.overrides
            .iter()
            .find(|entry| entry.name() == name)
            .map(EnvOverride::value)
    }

    /// Iterate overrides in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &EnvOverride> {
        self.overrides.iter()
    }

    /// Return the number of overrides.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.overrides.len()
    }

    /// Return whether the set is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    /// Render every override as `NAME=value`.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.overrides.iter().map(EnvOverride::entry).collect()
    }
}
