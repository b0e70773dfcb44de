//! Scenario state for task lifecycle behavioural tests.

use std::sync::{Arc, Mutex};

use k2cli::engine::CleanupReport;
use rstest::fixture;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;

/// How the scripted container behaves after it starts.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ContainerBehaviour {
    Exits(i64),
    NeverExits,
}

/// The parts of a task report the assertions inspect.
#[derive(Debug, Clone)]
pub(crate) struct RunSummary {
    pub(crate) completed_with: Option<i64>,
    pub(crate) timed_out: bool,
    pub(crate) exit_status: u8,
    pub(crate) cleanup: CleanupReport,
}

#[derive(Default, ScenarioState)]
pub(crate) struct LifecycleState {
    pub(crate) behaviour: Slot<ContainerBehaviour>,
    pub(crate) keep_alive: Slot<bool>,
    pub(crate) deadline_passed: Slot<bool>,
    /// Cleanup calls in the order the engine received them.
    pub(crate) calls: Slot<Arc<Mutex<Vec<String>>>>,
    pub(crate) summary: Slot<RunSummary>,
}

#[fixture]
pub(crate) fn lifecycle_state() -> LifecycleState {
    let state = LifecycleState::default();
    state.behaviour.set(ContainerBehaviour::Exits(0));
    state.keep_alive.set(false);
    state.deadline_passed.set(false);
    state.calls.set(Arc::new(Mutex::new(Vec::new())));
    state
}
