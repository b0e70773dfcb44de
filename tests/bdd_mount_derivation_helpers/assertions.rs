//! Assertion helpers for mount derivation behavioural tests.

use k2cli::cluster::DerivedBindings;
use rstest_bdd_macros::then;

use super::StepResult;
use super::state::DerivationState;

fn derived(derivation_state: &DerivationState) -> StepResult<DerivedBindings> {
    derivation_state
        .derived
        .get()
        .ok_or_else(|| String::from("derivation should have run"))
}

#[then("the derived mount count is {count}")]
fn mount_count_is(derivation_state: &DerivationState, count: usize) -> StepResult<()> {
    let bindings = derived(derivation_state)?;
    if bindings.mounts.len() == count {
        Ok(())
    } else {
        Err(format!(
            "expected {count} mounts, got {:?}",
            bindings.mounts.binds()
        ))
    }
}

#[then("the key file is mounted at the same path")]
fn key_file_is_identity_mounted(derivation_state: &DerivationState) -> StepResult<()> {
    let bindings = derived(derivation_state)?;
    let key = derivation_state
        .key_path
        .get()
        .ok_or_else(|| String::from("key file should exist"))?;
    let expected = format!("{key}:{key}");
    if bindings.mounts.contains_bind(&expected) {
        Ok(())
    } else {
        Err(format!(
            "expected bind {expected}, got {:?}",
            bindings.mounts.binds()
        ))
    }
}

#[then("no environment overrides are derived")]
fn no_overrides(derivation_state: &DerivationState) -> StepResult<()> {
    let bindings = derived(derivation_state)?;
    if bindings.env.is_empty() {
        Ok(())
    } else {
        Err(format!("expected no overrides, got {:?}", bindings.env.entries()))
    }
}

#[then("the override {name} has the value {value}")]
fn override_has_value(
    derivation_state: &DerivationState,
    name: String,
    value: String,
) -> StepResult<()> {
    let bindings = derived(derivation_state)?;
    match bindings.env.get(&name) {
        Some(actual) if actual == value => Ok(()),
        other => Err(format!("expected {name}={value}, got {other:?}")),
    }
}

#[then("the override {name} is empty")]
fn override_is_empty(derivation_state: &DerivationState, name: String) -> StepResult<()> {
    let bindings = derived(derivation_state)?;
    match bindings.env.get(&name) {
        Some("") => Ok(()),
        other => Err(format!("expected empty {name}, got {other:?}")),
    }
}
