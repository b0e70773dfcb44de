//! Cluster actions and the automation command line each one runs.

use camino::Utf8Path;

use crate::error::ConfigError;

const PLAYBOOK: &str = "ansible-playbook";
const INVENTORY: &str = "ansible/inventory/localhost";

/// Stage list used when `up` is given none.
pub const ALL_STAGES: &str = "all";

/// A cluster operation run inside the task container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterAction {
    /// Create the cluster, running the given comma-separated stages.
    Up {
        /// Stages passed to `--tags`.
        stages: String,
    },
    /// Update the given comma-separated node pools.
    Update {
        /// Node pools to update.
        nodepools: String,
    },
}

impl ClusterAction {
    /// An `up` action; blank stages mean [`ALL_STAGES`].
    #[must_use]
    pub fn up(stages: &str) -> Self {
        let trimmed = stages.trim();
        Self::Up {
            stages: String::from(if trimmed.is_empty() { ALL_STAGES } else { trimmed }),
        }
    }

    /// An `update` action for `nodepools`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingRequired` when no node pool is named.
    pub fn update(nodepools: Option<&str>) -> Result<Self, ConfigError> {
        let named = nodepools
            .map(str::trim)
            .filter(|list| list.split(',').any(|pool| !pool.trim().is_empty()))
            .ok_or_else(|| ConfigError::MissingRequired {
                field: String::from("nodepools"),
            })?;
        Ok(Self::Update {
            nodepools: String::from(named),
        })
    }

    /// Verb used in failure messages: "bringing up" or "updating".
    #[must_use]
    pub const fn progressive(&self) -> &'static str {
        match self {
            Self::Up { .. } => "bringing up",
            Self::Update { .. } => "updating",
        }
    }

    /// Build the argv run in the container.
    #[must_use]
    pub fn command_line(&self, config_path: &Utf8Path, output_dir: &Utf8Path) -> Vec<String> {
        let base = format!("config_path={config_path} config_base={output_dir}");
        let (playbook, extra_vars, tags) = match self {
            Self::Up { stages } => (
                "ansible/up.yaml",
                format!("{base} kraken_action=up "),
                Some(stages.as_str()),
            ),
            Self::Update { nodepools } => (
                "ansible/update.yaml",
                format!("{base} kraken_action=update update_nodepools={nodepools}"),
                None,
            ),
        };

        let mut argv = [PLAYBOOK, "-i", INVENTORY, playbook, "--extra-vars"]
            .map(String::from)
            .to_vec();
        argv.push(extra_vars);
        if let Some(stage_list) = tags {
            argv.extend([String::from("--tags"), String::from(stage_list)]);
        }
        argv
    }
}
