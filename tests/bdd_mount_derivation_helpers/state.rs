//! Scenario state for mount derivation behavioural tests.

use std::collections::HashMap;
use std::sync::Arc;

use k2cli::cluster::DerivedBindings;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;
use tempfile::TempDir;

#[derive(Default, ScenarioState)]
pub(crate) struct DerivationState {
    /// Keeps the host key file alive for the scenario.
    pub(crate) host_dir: Slot<Arc<TempDir>>,
    pub(crate) key_path: Slot<String>,
    pub(crate) variables: Slot<HashMap<String, String>>,
    pub(crate) document: Slot<String>,
    pub(crate) derived: Slot<DerivedBindings>,
}

#[fixture]
pub(crate) fn derivation_state() -> DerivationState {
    let state = DerivationState::default();
    state.variables.set(HashMap::new());
    state
}
