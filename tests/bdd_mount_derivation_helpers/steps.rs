//! Given/when steps for mount derivation scenarios.

use std::sync::Arc;

use k2cli::cluster::{MountSet, derive_mounts_and_env, parse_cluster_config};
use mockable::MockEnv;
use rstest_bdd_macros::{given, when};
use tempfile::TempDir;

use super::StepResult;
use super::state::DerivationState;

#[given("a key file on the host")]
fn given_key_file(derivation_state: &DerivationState) -> StepResult<()> {
    let dir = TempDir::new().map_err(|e| format!("failed to create host directory: {e}"))?;
    let key_path = dir.path().join("id_rsa");
    std::fs::write(&key_path, "-----BEGIN KEY-----\n")
        .map_err(|e| format!("failed to write key file: {e}"))?;
    let key = key_path
        .to_str()
        .ok_or_else(|| String::from("key path should be UTF-8"))?;
    derivation_state.key_path.set(String::from(key));
    derivation_state.host_dir.set(Arc::new(dir));
    Ok(())
}

#[given("a cluster configuration referencing the key file twice")]
fn given_key_referenced_twice(derivation_state: &DerivationState) -> StepResult<()> {
    let key = derivation_state
        .key_path
        .get()
        .ok_or_else(|| String::from("key file should exist"))?;
    derivation_state.document.set(format!(
        concat!(
            "clusters:\n",
            "  - name: prod\n",
            "keypair:\n",
            "  - privatekeyFile: {key}\n",
            "nodePools:\n",
            "  - name: workers\n",
            "    keyFile: {key}\n",
        ),
        key = key,
    ));
    Ok(())
}

#[given("the variable {name} is set to {value}")]
fn given_variable(derivation_state: &DerivationState, name: String, value: String) {
    let mut variables = derivation_state.variables.get().unwrap_or_default();
    variables.insert(name, value);
    derivation_state.variables.set(variables);
}

#[given("a cluster configuration with the value {value}")]
fn given_single_value(derivation_state: &DerivationState, value: String) {
    derivation_state
        .document
        .set(format!("providerConfig:\n  secret: \"{value}\"\n"));
}

#[given("a cluster configuration with only numbers and booleans")]
fn given_non_string_scalars(derivation_state: &DerivationState) {
    derivation_state.document.set(String::from(concat!(
        "nodePools:\n",
        "  - count: 3\n",
        "    ratio: 0.5\n",
        "    enabled: true\n",
        "    taints: ~\n",
    )));
}

#[when("mounts and environment are derived")]
fn when_derived(derivation_state: &DerivationState) -> StepResult<()> {
    let document = derivation_state
        .document
        .get()
        .ok_or_else(|| String::from("cluster configuration should be set"))?;
    let tree = parse_cluster_config(&document).map_err(|e| format!("invalid YAML: {e}"))?;

    let variables = derivation_state.variables.get().unwrap_or_default();
    let mut env = MockEnv::new();
    env.expect_string()
        .returning(move |key| variables.get(key).cloned());

    let derived = derive_mounts_and_env(&tree, MountSet::new(), &env)
        .map_err(|e| format!("derivation failed: {e}"))?;
    derivation_state.derived.set(derived);
    Ok(())
}
