//! Container environment and mounts every run starts from.

use camino::Utf8Path;

use crate::cluster::{EnvOverride, EnvOverrides, MountSet, MountSpec};

/// Cloud credential variables copied from the host when non-empty.
const PASSTHROUGH_VARS: &[&str] = &[
    "AWS_ACCESS_KEY_ID",
    "AWS_SECRET_ACCESS_KEY",
    "AWS_DEFAULT_REGION",
    "CLOUDSDK_COMPUTE_ZONE",
    "CLOUDSDK_COMPUTE_REGION",
];

/// Name of the per-cluster helm override variable.
///
/// Dashes become underscores so the name is a valid shell identifier.
#[must_use]
pub fn helm_override_var(cluster: &str) -> String {
    format!("helm_override_{}", cluster.replace('-', "_"))
}

/// Build the fixed environment plus host passthrough for `cluster`.
#[must_use]
pub fn baseline_env<E: mockable::Env>(
    output_dir: &Utf8Path,
    cluster: &str,
    env: &E,
) -> EnvOverrides {
    let state_dir = output_dir.join(cluster);
    let mut overrides = EnvOverrides::new();
    overrides.insert(EnvOverride::new("ANSIBLE_NOCOLOR", "True"));
    overrides.insert(EnvOverride::new("DISPLAY_SKIPPED_HOSTS", "0"));
    overrides.insert(EnvOverride::new(
        "KUBECONFIG",
        state_dir.join("admin.kubeconfig").as_str(),
    ));
    overrides.insert(EnvOverride::new("HELM_HOME", state_dir.join(".helm").as_str()));

    let helm_override = helm_override_var(cluster);
    for name in PASSTHROUGH_VARS
        .iter()
        .copied()
        .chain(std::iter::once(helm_override.as_str()))
    {
        if let Some(value) = env.string(name).filter(|value| !value.is_empty()) {
            overrides.insert(EnvOverride::new(name, value));
        }
    }
    overrides
}

/// Mount the cluster configuration file and the output directory at their
/// host paths.
#[must_use]
pub fn baseline_mounts(config_path: &Utf8Path, output_dir: &Utf8Path) -> MountSet {
    let mut mounts = MountSet::new();
    if !config_path.as_str().trim().is_empty() {
        mounts.insert(MountSpec::identity(config_path));
    }
    mounts.insert(MountSpec::identity(output_dir));
    mounts
}
