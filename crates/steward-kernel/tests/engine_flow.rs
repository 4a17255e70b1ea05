//! End-to-end runs through the engine entry point

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use steward_capability::{Capability, OwnerId};
use steward_core::TaskOutcome;
use steward_kernel::{Engine, Trigger};
use steward_policy::RulePolicyEngine;
use steward_test_utils::{
    answer, call, owner, propose, step, Harness, Lane, RecordingTransport, Scripted,
    StaticCapability,
};
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn denied_step_still_completes_with_answer() {
    let search = StaticCapability::new("search", "Lisbon: 18C, sunny");
    let shell = StaticCapability::new("shell", "ran");
    let caps: Vec<Arc<dyn Capability>> = vec![search.clone(), shell.clone()];
    let mut policy = RulePolicyEngine::with_default_rules();
    policy.deny_capability("shell");
    let h = Harness::with_policy(caps, policy);

    h.reasoning
        .plan(propose(vec![
            step(1, "get the weather", "pending", &["search"]),
            step(2, "save it to a file", "pending", &["shell"]),
        ]))
        .plan(propose(vec![
            step(1, "get the weather", "completed", &["search"]),
            step(2, "save it to a file", "pending", &["shell"]),
        ]))
        .plan(answer(
            "Lisbon is 18C and sunny. I could not save it: capability 'shell' is restricted by system policy.",
        ));
    h.reasoning
        .work(call("search", json!({ "q": "lisbon weather" })))
        .work(answer("18C, sunny"))
        .work(call("shell", json!({ "command": "echo 18C > weather.txt" })))
        .work(answer("The shell capability is restricted by system policy."));

    let transport = RecordingTransport::new();
    let engine = Engine::new(h.planner(), transport.clone());

    let outcome = engine
        .handle_message(owner(), "Weather in Lisbon, saved to a file", &CancellationToken::new())
        .await;

    let TaskOutcome::Answer(text) = &outcome else {
        panic!("expected an answer, got {outcome:?}");
    };
    assert!(text.contains("restricted by system policy"));
    assert!(shell.calls().is_empty());
    assert_eq!(search.calls().len(), 1);

    let worker = h.reasoning.requests_from(Lane::Worker);
    assert_eq!(
        worker[3].messages.last().unwrap().content,
        "Policy Error: capability 'shell' is restricted by system policy"
    );
    assert_eq!(transport.sent(), vec![(owner(), text.clone())]);
}

#[tokio::test]
async fn failure_diagnostic_is_delivered() {
    let h = Harness::new(Vec::new());
    let transport = RecordingTransport::new();
    let engine = Engine::new(h.planner(), transport.clone());

    let outcome = engine
        .handle_message(owner(), "hello", &CancellationToken::new())
        .await;

    assert!(matches!(outcome, TaskOutcome::Failed(_)));
    let sent = transport.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(
        sent[0].1,
        "The task could not be completed: reasoning service unavailable: Planner script exhausted."
    );
}

#[tokio::test(start_paused = true)]
async fn runs_for_one_owner_are_serialised() {
    let h = Harness::new(Vec::new());
    h.reasoning
        .plan(Scripted::Delay(Duration::from_secs(10), answer("first")))
        .plan(Scripted::Delay(Duration::from_secs(10), answer("second")));
    let engine = Engine::new(h.planner(), RecordingTransport::new());
    let cancel = CancellationToken::new();

    let a = Trigger::interactive(owner(), "one");
    let b = Trigger::interactive(owner(), "two");
    let started = tokio::time::Instant::now();
    let (first, second) = tokio::join!(engine.run(&a, &cancel), engine.run(&b, &cancel));

    assert_eq!(first, TaskOutcome::Answer("first".into()));
    assert_eq!(second, TaskOutcome::Answer("second".into()));
    assert!(started.elapsed() >= Duration::from_secs(20));

    // the second run saw the first exchange in its history
    let planner = h.reasoning.requests_from(Lane::Planner);
    assert!(planner[1].messages.iter().any(|m| m.content == "first"));
}

#[tokio::test(start_paused = true)]
async fn different_owners_run_concurrently() {
    let h = Harness::new(Vec::new());
    h.reasoning
        .plan(Scripted::Delay(Duration::from_secs(10), answer("for alice")))
        .plan(Scripted::Delay(Duration::from_secs(10), answer("for bob")));
    let engine = Engine::new(h.planner(), RecordingTransport::new());
    let cancel = CancellationToken::new();

    let a = Trigger::interactive(OwnerId::from("alice"), "one");
    let b = Trigger::interactive(OwnerId::from("bob"), "two");
    let started = tokio::time::Instant::now();
    let (first, second) = tokio::join!(engine.run(&a, &cancel), engine.run(&b, &cancel));

    assert!(matches!(first, TaskOutcome::Answer(_)));
    assert!(matches!(second, TaskOutcome::Answer(_)));
    assert!(started.elapsed() < Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn owner_locks_are_released_when_idle() {
    let h = Harness::new(Vec::new());
    h.reasoning
        .plan(Scripted::Delay(Duration::from_secs(10), answer("first")))
        .plan(Scripted::Delay(Duration::from_secs(10), answer("second")))
        .plan(Scripted::Delay(Duration::from_secs(10), answer("for bob")));
    let engine = Arc::new(Engine::new(h.planner(), RecordingTransport::new()));
    let cancel = CancellationToken::new();

    let runs = tokio::spawn({
        let engine = engine.clone();
        let cancel = cancel.clone();
        async move {
            let a = Trigger::interactive(owner(), "one");
            let b = Trigger::interactive(owner(), "two");
            let c = Trigger::interactive(OwnerId::from("bob"), "three");
            tokio::join!(
                engine.run(&a, &cancel),
                engine.run(&b, &cancel),
                engine.run(&c, &cancel)
            )
        }
    });

    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(engine.active_owners(), 2);

    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.active_owners(), 1);

    runs.await.unwrap();
    assert_eq!(engine.active_owners(), 0);
}

#[tokio::test]
async fn cancelled_trigger_is_not_run() {
    let h = Harness::new(Vec::new());
    h.reasoning.plan(answer("never"));
    let transport = RecordingTransport::new();
    let engine = Engine::new(h.planner(), transport.clone());
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = engine.handle_message(owner(), "hi", &cancel).await;

    assert_eq!(outcome, TaskOutcome::Cancelled);
    assert!(h.reasoning.requests().is_empty());
    assert_eq!(transport.sent(), vec![(owner(), "Task cancelled.".to_string())]);
}
