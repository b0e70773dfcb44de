//! Assertion helpers for task lifecycle behavioural tests.

use k2cli::engine::{CleanupReport, container_name};
use rstest_bdd_macros::then;

use super::StepResult;
use super::state::{LifecycleState, RunSummary};

fn summary(lifecycle_state: &LifecycleState) -> StepResult<RunSummary> {
    lifecycle_state
        .summary
        .get()
        .ok_or_else(|| String::from("the task should have run"))
}

fn calls(lifecycle_state: &LifecycleState) -> StepResult<Vec<String>> {
    let log = lifecycle_state
        .calls
        .get()
        .ok_or_else(|| String::from("call log should be configured"))?;
    let recorded = log
        .lock()
        .map_err(|_| String::from("call log lock should not be poisoned"))?
        .clone();
    Ok(recorded)
}

#[then("the outcome is completed with code {code}")]
fn outcome_is_completed(lifecycle_state: &LifecycleState, code: i64) -> StepResult<()> {
    match summary(lifecycle_state)?.completed_with {
        Some(actual) if actual == code => Ok(()),
        other => Err(format!("expected completion with {code}, got {other:?}")),
    }
}

#[then("the outcome is timed out")]
fn outcome_is_timed_out(lifecycle_state: &LifecycleState) -> StepResult<()> {
    let run = summary(lifecycle_state)?;
    if run.timed_out {
        Ok(())
    } else {
        Err(format!("expected a timeout, got {run:?}"))
    }
}

#[then("the container was removed without force")]
fn removed_without_force(lifecycle_state: &LifecycleState) -> StepResult<()> {
    expect_removal(lifecycle_state, false)
}

#[then("the container was removed with force")]
fn removed_with_force(lifecycle_state: &LifecycleState) -> StepResult<()> {
    expect_removal(lifecycle_state, true)
}

fn expect_removal(lifecycle_state: &LifecycleState, forced: bool) -> StepResult<()> {
    let run = summary(lifecycle_state)?;
    let recorded = calls(lifecycle_state)?;
    let expected_call = format!("remove force={forced}");
    if run.cleanup == (CleanupReport::Removed { forced }) && recorded == [expected_call] {
        Ok(())
    } else {
        Err(format!(
            "expected a single removal with force={forced}, got {:?} after {recorded:?}",
            run.cleanup
        ))
    }
}

#[then("the container was killed and then renamed")]
fn killed_then_renamed(lifecycle_state: &LifecycleState) -> StepResult<()> {
    let run = summary(lifecycle_state)?;
    let recorded = calls(lifecycle_state)?;
    let original = container_name("bdd");

    let CleanupReport::KilledAndRenamed { from, to } = &run.cleanup else {
        return Err(format!("expected kill and rename, got {:?}", run.cleanup));
    };
    if from != &original || to == &original {
        return Err(format!("unexpected rename {from} -> {to}"));
    }
    match recorded.as_slice() {
        [kill, rename] if kill == "kill" && rename == &format!("rename {to}") => Ok(()),
        other => Err(format!("expected kill then rename, got {other:?}")),
    }
}

#[then("the exit status is {status}")]
fn exit_status_is(lifecycle_state: &LifecycleState, status: u8) -> StepResult<()> {
    let actual = summary(lifecycle_state)?.exit_status;
    if actual == status {
        Ok(())
    } else {
        Err(format!("expected exit status {status}, got {actual}"))
    }
}
