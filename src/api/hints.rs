//! Post-run hints pointing at cluster state left in the output directory.

use camino::Utf8Path;

/// Line printed before hints when the run did not succeed.
pub const PARTIAL_STATE_NOTICE: &str = "Some of the cluster state MAY be available:";

/// Describe how to reach the cluster with the files found under
/// `<output_dir>/<cluster>/`.
///
/// Returns no lines when neither `admin.kubeconfig` nor `ssh_config` exist.
#[must_use]
pub fn recovery_hints(output_dir: &Utf8Path, cluster: &str) -> Vec<String> {
    let state_dir = output_dir.join(cluster);
    let kubeconfig = state_dir.join("admin.kubeconfig");
    let ssh_config = state_dir.join("ssh_config");
    let mut lines = Vec::new();

    if kubeconfig.exists() {
        lines.extend([
            String::from("To use kubectl: "),
            format!(" kubectl --kubeconfig={kubeconfig} [kubectl commands]"),
            String::from("To use helm: "),
            format!(" export KUBECONFIG={kubeconfig}"),
            format!(" helm [helm command] --home {}", state_dir.join(".helm")),
        ]);
    }

    if ssh_config.exists() {
        lines.extend([
            String::from("To use ssh: "),
            format!(" ssh <node pool name>-<number> -F {ssh_config}"),
        ]);
    }

    lines
}
