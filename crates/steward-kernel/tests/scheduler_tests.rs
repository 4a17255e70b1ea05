//! Scheduler: due-task selection, delivery, failure handling, tick timing

use chrono::Utc;
use mockall::mock;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use steward_capability::OwnerId;
use steward_core::{NewScheduledTask, ScheduledTask, Store, Transport, TransportError};
use steward_kernel::{scheduled_instruction, Engine, Scheduler, SCHEDULED_BANNER};
use steward_test_utils::{answer, owner, propose, step, Harness, Lane, RecordingTransport};
use tokio_util::sync::CancellationToken;

mock! {
    pub Chat {}

    #[async_trait::async_trait]
    impl Transport for Chat {
        async fn send(&self, owner: &OwnerId, text: &str) -> Result<(), TransportError>;
    }
}

async fn add(h: &Harness, description: &str, interval_secs: u64) -> ScheduledTask {
    h.store
        .add_task(NewScheduledTask {
            owner: owner(),
            description: description.into(),
            interval_secs,
            not_before: None,
        })
        .await
        .unwrap()
}

fn scheduler(h: &Harness, transport: impl Transport + 'static) -> Scheduler {
    Scheduler::new(Arc::new(Engine::new(h.planner(), Arc::new(transport))))
}

#[tokio::test]
async fn recurring_task_runs_and_is_delivered_with_banner() {
    let h = Harness::new(Vec::new());
    let task = add(&h, "remind me to stretch", 3600).await;
    h.reasoning.plan(answer("Time to stretch!"));

    let mut chat = MockChat::new();
    chat.expect_send()
        .withf(|to, text| {
            to.as_str() == "chat-1" && text.to_string() == "⏰ Scheduled Task Output\n\nTime to stretch!"
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let delivered = scheduler(&h, chat)
        .poll_once(Utc::now(), &CancellationToken::new())
        .await;

    assert_eq!(delivered, 1);
    let stored = &h.store.tasks()[0];
    assert_eq!(stored.id, task.id);
    assert!(stored.last_run.is_some());

    let planner = h.reasoning.requests_from(Lane::Planner);
    assert_eq!(
        planner[0].messages.last().unwrap().content,
        scheduled_instruction("remind me to stretch")
    );
}

#[tokio::test]
async fn one_shot_task_is_deleted_after_running() {
    let h = Harness::new(Vec::new());
    add(&h, "say hello", 0).await;
    h.reasoning.plan(answer("Hello!"));
    let transport = RecordingTransport::new();

    let delivered = Scheduler::new(Arc::new(Engine::new(h.planner(), transport.clone())))
        .poll_once(Utc::now(), &CancellationToken::new())
        .await;

    assert_eq!(delivered, 1);
    assert!(h.store.tasks().is_empty());
    assert_eq!(
        transport.sent(),
        vec![(owner(), format!("{SCHEDULED_BANNER}Hello!"))]
    );
}

#[tokio::test]
async fn planning_failure_leaves_task_due() {
    let h = Harness::new(Vec::new());
    add(&h, "check the news", 600).await;
    // no planner script: the reasoning service is unavailable

    let mut chat = MockChat::new();
    chat.expect_send().times(0);

    let now = Utc::now();
    let delivered = scheduler(&h, chat)
        .poll_once(now, &CancellationToken::new())
        .await;

    assert_eq!(delivered, 0);
    assert!(h.store.tasks()[0].last_run.is_none());
    assert_eq!(h.store.due_tasks(now).await.unwrap().len(), 1);
}

#[tokio::test]
async fn aborted_run_counts_as_completed() {
    let h = Harness::new(Vec::new());
    add(&h, "summarize my day", 600).await;
    for _ in 0..3 {
        h.reasoning
            .plan(propose(vec![step(1, "collect notes", "completed", &[])]));
    }
    let transport = RecordingTransport::new();

    let delivered = Scheduler::new(Arc::new(Engine::new(h.planner(), transport.clone())))
        .poll_once(Utc::now(), &CancellationToken::new())
        .await;

    assert_eq!(delivered, 1);
    assert!(h.store.tasks()[0].last_run.is_some());
    let sent = transport.sent();
    assert!(sent[0].1.starts_with(SCHEDULED_BANNER));
    assert!(sent[0].1.contains("failed to produce a final answer"));
}

#[tokio::test]
async fn tasks_not_yet_due_are_skipped() {
    let h = Harness::new(Vec::new());
    let task = add(&h, "hourly check", 3600).await;
    let now = Utc::now();
    h.store.mark_task_run(task.id, now).await.unwrap();

    let mut chat = MockChat::new();
    chat.expect_send().times(0);

    let delivered = scheduler(&h, chat)
        .poll_once(now + chrono::Duration::seconds(60), &CancellationToken::new())
        .await;

    assert_eq!(delivered, 0);
    assert!(h.reasoning.requests().is_empty());
}

#[tokio::test]
async fn delivery_failure_does_not_stop_the_tick() {
    let h = Harness::new(Vec::new());
    add(&h, "first", 600).await;
    add(&h, "second", 600).await;
    h.reasoning.plan(answer("one")).plan(answer("two"));

    let mut chat = MockChat::new();
    chat.expect_send().times(2).returning(|to, _| {
        Err(TransportError::Delivery {
            owner: to.to_string(),
            reason: "offline".into(),
        })
    });

    let delivered = scheduler(&h, chat)
        .poll_once(Utc::now(), &CancellationToken::new())
        .await;

    assert_eq!(delivered, 2);
    assert!(h.store.tasks().iter().all(|t| t.last_run.is_some()));
}

#[tokio::test(start_paused = true)]
async fn first_poll_happens_one_tick_after_start() {
    let h = Harness::new(Vec::new());
    add(&h, "ping", 0).await;
    h.reasoning.plan(answer("pong"));
    let transport = RecordingTransport::new();
    let scheduler = Scheduler::new(Arc::new(Engine::new(h.planner(), transport.clone())));

    let cancel = CancellationToken::new();
    let handle = tokio::spawn({
        let scheduler = scheduler.clone();
        let cancel = cancel.clone();
        async move { scheduler.start(cancel).await }
    });

    tokio::time::sleep(Duration::from_secs(29)).await;
    assert!(transport.sent().is_empty());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(transport.sent().len(), 1);

    cancel.cancel();
    handle.await.unwrap();
}
