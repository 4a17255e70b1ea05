//! Runtime lifecycle: scheduler gating and shutdown

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use steward_core::{NewScheduledTask, Store};
use steward_kernel::{Engine, Runtime, SchedulerConfig, SCHEDULED_BANNER};
use steward_test_utils::{answer, owner, Harness, RecordingTransport};
use tokio_util::sync::CancellationToken;

async fn with_due_task(h: &Harness) {
    h.store
        .add_task(NewScheduledTask {
            owner: owner(),
            description: "ping".into(),
            interval_secs: 0,
            not_before: None,
        })
        .await
        .unwrap();
    h.reasoning.plan(answer("pong"));
}

fn scheduler_config(enabled: bool) -> SchedulerConfig {
    SchedulerConfig {
        enabled,
        ..SchedulerConfig::default()
    }
}

#[tokio::test(start_paused = true)]
async fn enabled_scheduler_delivers_due_tasks() {
    let h = Harness::new(Vec::new());
    with_due_task(&h).await;
    let transport = RecordingTransport::new();
    let engine = Arc::new(Engine::new(h.planner(), transport.clone()));

    let runtime = Runtime::start(engine, &scheduler_config(true), CancellationToken::new());
    assert!(runtime.scheduler_running());

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(
        transport.sent(),
        vec![(owner(), format!("{SCHEDULED_BANNER}pong"))]
    );

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn disabled_scheduler_never_starts() {
    let h = Harness::new(Vec::new());
    with_due_task(&h).await;
    let transport = RecordingTransport::new();
    let engine = Arc::new(Engine::new(h.planner(), transport.clone()));

    let runtime = Runtime::start(engine, &scheduler_config(false), CancellationToken::new());
    assert!(!runtime.scheduler_running());

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert!(transport.sent().is_empty());
    assert_eq!(h.store.tasks()[0].last_run, None);

    runtime.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cancellation_stops_the_scheduler() {
    let h = Harness::new(Vec::new());
    let engine = Arc::new(Engine::new(h.planner(), RecordingTransport::new()));
    let cancel = CancellationToken::new();

    let runtime = Runtime::start(engine, &scheduler_config(true), cancel.clone());
    cancel.cancel();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(!runtime.scheduler_running());
    runtime.run_until_ctrl_c().await;
}
