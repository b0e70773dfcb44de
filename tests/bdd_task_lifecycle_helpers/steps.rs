//! Given/when steps for task lifecycle scenarios.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use bollard::container::LogOutput;
use bollard::errors::Error as BollardError;
use bollard::models::{ContainerCreateBody, ContainerCreateResponse};
use bollard::query_parameters::CreateContainerOptions;
use futures_util::stream;
use k2cli::engine::{
    ContainerRuntime, LifecycleManager, LogStream, RunOutcome, RunPolicy, RuntimeFuture, TaskRun,
    container_name,
};
use mockall::mock;
use rstest_bdd_macros::{given, when};

use super::StepResult;
use super::state::{ContainerBehaviour, LifecycleState, RunSummary};

mock! {
    #[derive(Debug)]
    Engine {}

    impl ContainerRuntime for Engine {
        fn create_container<'a>(
            &'a self,
            options: Option<CreateContainerOptions>,
            body: ContainerCreateBody,
        ) -> RuntimeFuture<'a, ContainerCreateResponse>;
        fn start_container<'a>(&'a self, container_id: &str) -> RuntimeFuture<'a, ()>;
        fn wait_container<'a>(&'a self, container_id: &str) -> RuntimeFuture<'a, i64>;
        fn logs<'a>(&'a self, container_id: &str, follow: bool) -> LogStream<'a>;
        fn kill_container<'a>(&'a self, container_id: &str) -> RuntimeFuture<'a, ()>;
        fn remove_container<'a>(&'a self, container_id: &str, force: bool) -> RuntimeFuture<'a, ()>;
        fn rename_container<'a>(
            &'a self,
            container_id: &str,
            new_name: &str,
        ) -> RuntimeFuture<'a, ()>;
    }
}

fn ready<T: Send + 'static>(value: T) -> RuntimeFuture<'static, T> {
    Box::pin(async move { Ok(value) })
}

fn hanging() -> RuntimeFuture<'static, i64> {
    Box::pin(futures_util::future::pending())
}

fn record(calls: &Arc<Mutex<Vec<String>>>, call: String) {
    calls
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .push(call);
}

fn scripted_engine(behaviour: ContainerBehaviour, calls: &Arc<Mutex<Vec<String>>>) -> MockEngine {
    let mut engine = MockEngine::new();
    engine.expect_create_container().returning(|_, _| {
        ready(ContainerCreateResponse {
            id: String::from("bdd-container"),
            warnings: vec![],
        })
    });
    engine.expect_start_container().returning(|_| ready(()));
    engine.expect_wait_container().returning(move |_| match behaviour {
        ContainerBehaviour::Exits(code) => ready(code),
        ContainerBehaviour::NeverExits => hanging(),
    });
    engine.expect_logs().returning(|_, _| {
        let chunks: Vec<Result<LogOutput, BollardError>> = vec![Ok(LogOutput::StdOut {
            message: "PLAY RECAP\n".into(),
        })];
        Box::pin(stream::iter(chunks))
    });

    let kills = Arc::clone(calls);
    engine.expect_kill_container().returning(move |_| {
        record(&kills, String::from("kill"));
        ready(())
    });
    let removals = Arc::clone(calls);
    engine
        .expect_remove_container()
        .returning(move |_, force| {
            record(&removals, format!("remove force={force}"));
            ready(())
        });
    let renames = Arc::clone(calls);
    engine
        .expect_rename_container()
        .returning(move |_, new_name| {
            record(&renames, format!("rename {new_name}"));
            ready(())
        });
    engine
}

#[given("the task container exits with code {code}")]
fn given_exit_code(lifecycle_state: &LifecycleState, code: i64) {
    lifecycle_state.behaviour.set(ContainerBehaviour::Exits(code));
}

#[given("the task container never exits")]
fn given_never_exits(lifecycle_state: &LifecycleState) {
    lifecycle_state.behaviour.set(ContainerBehaviour::NeverExits);
}

#[given("the deadline has already passed")]
fn given_deadline_passed(lifecycle_state: &LifecycleState) {
    lifecycle_state.deadline_passed.set(true);
}

#[given("keep-alive is enabled")]
fn given_keep_alive_enabled(lifecycle_state: &LifecycleState) {
    lifecycle_state.keep_alive.set(true);
}

#[given("keep-alive is disabled")]
fn given_keep_alive_disabled(lifecycle_state: &LifecycleState) {
    lifecycle_state.keep_alive.set(false);
}

#[when("the task runs")]
fn when_task_runs(lifecycle_state: &LifecycleState) -> StepResult<()> {
    let behaviour = lifecycle_state
        .behaviour
        .get()
        .ok_or_else(|| String::from("container behaviour should be configured"))?;
    let keep_alive = lifecycle_state.keep_alive.get().unwrap_or(false);
    let timeout = if lifecycle_state.deadline_passed.get().unwrap_or(false) {
        Duration::ZERO
    } else {
        Duration::from_secs(30)
    };
    let calls = lifecycle_state
        .calls
        .get()
        .ok_or_else(|| String::from("call log should be configured"))?;

    let engine = scripted_engine(behaviour, &calls);
    let task = TaskRun::new("quay.io/samsung_cnct/k2:latest", &container_name("bdd"))
        .map_err(|e| format!("failed to build task: {e}"))?;

    let runtime =
        tokio::runtime::Runtime::new().map_err(|e| format!("failed to create runtime: {e}"))?;
    let report = runtime
        .block_on(async {
            let policy = RunPolicy::from_timeout(timeout, keep_alive);
            LifecycleManager::new(&engine).run(&task, policy).await
        })
        .map_err(|e| format!("task run failed: {e}"))?;

    lifecycle_state.summary.set(RunSummary {
        completed_with: match report.outcome {
            RunOutcome::Completed { exit_code } => Some(exit_code),
            RunOutcome::TimedOut | RunOutcome::Failed(_) => None,
        },
        timed_out: matches!(report.outcome, RunOutcome::TimedOut),
        exit_status: report.outcome.exit_status(),
        cleanup: report.cleanup,
    });
    Ok(())
}
