//! Container names.

use uuid::Uuid;

/// Prefix shared by every container this tool creates.
const NAME_PREFIX: &str = "k2-";

/// Return the deterministic container name for `cluster`.
#[must_use]
pub fn container_name(cluster: &str) -> String {
    format!("{NAME_PREFIX}{cluster}")
}

/// Return a fresh random name for preserving a container.
///
/// The result never equals `current`, so a preserved container frees the
/// deterministic name for the next run.
#[must_use]
pub fn preserved_name(current: &str) -> String {
    loop {
        let candidate = format!("{NAME_PREFIX}{}", Uuid::new_v4().simple());
        if candidate != current {
            return candidate;
        }
    }
}
