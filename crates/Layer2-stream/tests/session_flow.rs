//! End-to-end session traces against scripted remote handles
//!
//! Every test drives a real polling loop with a mock `TaskHandle` that
//! serves a fixed sequence of snapshots (or errors), then asserts on the
//! full emitted event trace and the registry's final contents.

use async_trait::async_trait;
use relay_foundation::EngineConfig;
use relay_remote::{RemoteError, TaskHandle, TaskSnapshot};
use relay_stream::{TaskEvent, TaskMetadata, TaskRegistry, TaskSession};
use serde_json::json;
use std::collections::VecDeque;
use std::time::Duration;

/// Serves a scripted sequence of refresh results; the last entry repeats
/// once the script is exhausted
struct ScriptedHandle {
    id: Option<String>,
    script: VecDeque<Result<TaskSnapshot, RemoteError>>,
    last: Option<Result<TaskSnapshot, RemoteError>>,
}

impl ScriptedHandle {
    fn new(id: &str, script: Vec<Result<TaskSnapshot, RemoteError>>) -> Self {
        Self {
            id: Some(id.to_string()),
            script: script.into(),
            last: None,
        }
    }
}

#[async_trait]
impl TaskHandle for ScriptedHandle {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }

    async fn refresh(&mut self) -> Result<TaskSnapshot, RemoteError> {
        if let Some(next) = self.script.pop_front() {
            self.last = Some(next.clone());
            return next;
        }
        self.last
            .clone()
            .unwrap_or_else(|| Ok(TaskSnapshot::default()))
    }
}

fn snapshot(value: serde_json::Value) -> Result<TaskSnapshot, RemoteError> {
    Ok(serde_json::from_value(value).unwrap())
}

fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_ms: 5,
        max_ticks: 50,
        // keep heartbeats out of the traces below
        heartbeat_interval_ms: 60_000,
        channel_capacity: 64,
        defensive_completion: true,
    }
}

/// Drain a session's stream to completion (sender dropped on loop exit)
async fn collect_events(
    session: &relay_stream::SessionHandle,
) -> Vec<TaskEvent> {
    let mut rx = session.take_receiver().await.expect("receiver available");
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

async fn wait_unregistered(registry: &TaskRegistry, task_id: &str) {
    for _ in 0..200 {
        if !registry.contains(task_id).await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("task {} still registered", task_id);
}

fn terminal_kinds(events: &[TaskEvent]) -> Vec<&'static str> {
    events
        .iter()
        .filter(|e| e.is_terminal())
        .map(|e| e.kind())
        .collect()
}

#[tokio::test]
async fn completed_task_emits_ordered_trace() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_ok",
        vec![
            snapshot(json!({ "status": "pending" })),
            snapshot(json!({ "status": "running" })),
            snapshot(json!({ "status": "completed", "result": "Hello" })),
        ],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::with_thread_id("thread_1"),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;

    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, ["status", "status", "status", "completed"]);

    match events.last().unwrap() {
        TaskEvent::Completed {
            result, thread_id, ..
        } => {
            assert_eq!(result, "Hello");
            assert_eq!(thread_id.as_deref(), Some("thread_1"));
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }

    wait_unregistered(&registry, "task_ok").await;
}

#[tokio::test]
async fn failed_task_emits_extracted_error() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_bad",
        vec![
            snapshot(json!({ "status": "running" })),
            snapshot(json!({ "status": "failed", "error": "compile error" })),
        ],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    assert_eq!(terminal_kinds(&events), ["failed"]);

    match events.last().unwrap() {
        TaskEvent::Failed { error, .. } => assert_eq!(error, "compile error"),
        other => panic!("unexpected terminal event: {:?}", other),
    }

    wait_unregistered(&registry, "task_bad").await;
}

#[tokio::test]
async fn unrecognized_status_with_result_completes_defensively() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_defensive",
        vec![snapshot(
            json!({ "status": "unknown_status_xyz", "web_url": "http://x" }),
        )],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    match events.last().unwrap() {
        TaskEvent::Completed {
            result, web_url, ..
        } => {
            assert_eq!(result, "Task completed successfully. View details at: http://x");
            assert_eq!(web_url.as_deref(), Some("http://x"));
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn in_flight_status_is_not_completed_by_result_data() {
    // status "running" + web_url keeps polling; completion only arrives
    // when the status flips
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_guarded",
        vec![
            snapshot(json!({ "status": "running", "web_url": "http://x" })),
            snapshot(json!({ "status": "running", "web_url": "http://x" })),
            snapshot(json!({ "status": "completed", "result": "finished" })),
        ],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    assert_eq!(terminal_kinds(&events), ["completed"]);

    // two running polls before the completed one: one status event each for
    // the running and completed phases
    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, ["status", "status", "completed"]);
}

#[tokio::test]
async fn budget_exhaustion_without_result_times_out_and_unregisters() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_stuck",
        vec![snapshot(json!({ "status": "running" }))],
    );

    let config = EngineConfig {
        max_ticks: 3,
        ..fast_config()
    };

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        config,
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    assert_eq!(terminal_kinds(&events), ["timeout"]);
    assert!(events.last().unwrap().is_terminal());

    match events.last().unwrap() {
        TaskEvent::Timeout { error, .. } => {
            assert!(error.contains("may still be running"), "got: {}", error);
        }
        other => panic!("unexpected terminal event: {:?}", other),
    }

    wait_unregistered(&registry, "task_stuck").await;
}

#[tokio::test]
async fn budget_exhaustion_with_result_salvages_completion() {
    // the final refresh carries result data the status string never
    // acknowledged
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_salvage",
        vec![
            snapshot(json!({ "status": "running" })),
            snapshot(json!({ "status": "running" })),
            snapshot(json!({ "status": "running", "result": "late result" })),
        ],
    );

    let config = EngineConfig {
        max_ticks: 2,
        ..fast_config()
    };

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        config,
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    assert_eq!(terminal_kinds(&events), ["completed"]);

    match events.last().unwrap() {
        TaskEvent::Completed { result, .. } => assert_eq!(result, "late result"),
        other => panic!("unexpected terminal event: {:?}", other),
    }
}

#[tokio::test]
async fn transient_refresh_errors_do_not_end_the_session() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_flaky",
        vec![
            Err(RemoteError::Network("connection reset".into())),
            snapshot(json!({ "status": "running" })),
            Err(RemoteError::ServerError("502".into())),
            snapshot(json!({ "status": "completed", "result": "recovered" })),
        ],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;

    let kinds: Vec<&str> = events.iter().map(|e| e.kind()).collect();
    assert_eq!(kinds, ["error", "status", "error", "status", "completed"]);
    assert_eq!(terminal_kinds(&events), ["completed"]);
}

#[tokio::test]
async fn cancellation_halts_polling_and_unregisters() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_cancelled",
        vec![snapshot(json!({ "status": "running" }))],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let mut rx = session.take_receiver().await.unwrap();

    // wait for the first status event so we know the loop is mid-Running
    let first = rx.recv().await.unwrap();
    assert_eq!(first.kind(), "status");

    session.cancel();

    // the stream ends without a terminal event
    let mut rest = Vec::new();
    while let Some(event) = rx.recv().await {
        rest.push(event);
    }
    assert!(terminal_kinds(&rest).is_empty(), "got: {:?}", rest);

    wait_unregistered(&registry, "task_cancelled").await;
}

#[tokio::test]
async fn dropped_consumer_tears_the_session_down() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_abandoned",
        vec![
            snapshot(json!({ "status": "pending" })),
            snapshot(json!({ "status": "running" })),
        ],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let rx = session.take_receiver().await.unwrap();
    drop(rx);

    wait_unregistered(&registry, "task_abandoned").await;
    assert!(session.is_cancelled());
}

#[tokio::test]
async fn step_changes_are_emitted_once_each() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_steps",
        vec![
            snapshot(json!({ "status": "running", "current_step": "cloning" })),
            snapshot(json!({ "status": "running", "current_step": "cloning" })),
            snapshot(json!({ "status": "running", "current_step": "testing" })),
            snapshot(json!({ "status": "completed", "result": "ok" })),
        ],
    );

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        fast_config(),
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    let steps: Vec<String> = events
        .iter()
        .filter_map(|e| match e {
            TaskEvent::Step { current_step, .. } => Some(current_step.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(steps, ["cloning", "testing"]);
}

#[tokio::test]
async fn heartbeats_flow_between_substantive_events() {
    let registry = TaskRegistry::new();
    let handle = ScriptedHandle::new(
        "task_slow",
        vec![snapshot(json!({ "status": "running" }))],
    );

    let config = EngineConfig {
        poll_interval_ms: 200,
        max_ticks: 3,
        heartbeat_interval_ms: 20,
        ..fast_config()
    };

    let session = TaskSession::spawn(
        Box::new(handle),
        TaskMetadata::default(),
        config,
        registry.clone(),
    )
    .await
    .unwrap();

    let events = collect_events(&session).await;
    let heartbeats = events.iter().filter(|e| e.kind() == "heartbeat").count();
    assert!(heartbeats >= 2, "expected heartbeats, got {:?}", events);

    // heartbeats never displace the terminal invariant
    assert_eq!(terminal_kinds(&events), ["timeout"]);
    let last_substantive = events.iter().rev().find(|e| e.kind() != "heartbeat");
    assert!(last_substantive.unwrap().is_terminal());
}

#[tokio::test]
async fn randomized_sessions_emit_exactly_one_terminal_event() {
    use rand::prelude::*;

    let in_flight = ["pending", "queued", "running", "in_progress", "warming_up"];
    let mut rng = StdRng::seed_from_u64(0xC0DE);

    for case in 0..20 {
        let registry = TaskRegistry::new();
        let mut script: Vec<Result<TaskSnapshot, RemoteError>> = Vec::new();

        for _ in 0..rng.gen_range(0..6) {
            if rng.gen_bool(0.2) {
                script.push(Err(RemoteError::Network("flaky".into())));
            } else {
                let status = in_flight.choose(&mut rng).unwrap();
                script.push(snapshot(json!({ "status": status })));
            }
        }

        // half the runs settle on their own, the rest hit the tick budget
        if rng.gen_bool(0.5) {
            if rng.gen_bool(0.5) {
                script.push(snapshot(json!({ "status": "completed", "result": "done" })));
            } else {
                script.push(snapshot(json!({ "status": "failed", "error": "broke" })));
            }
        }

        let task_id = format!("task_prop_{}", case);
        let config = EngineConfig {
            max_ticks: 8,
            ..fast_config()
        };

        let session = TaskSession::spawn(
            Box::new(ScriptedHandle::new(&task_id, script)),
            TaskMetadata::default(),
            config,
            registry.clone(),
        )
        .await
        .unwrap();

        let events = collect_events(&session).await;

        let terminals = terminal_kinds(&events);
        assert_eq!(terminals.len(), 1, "case {}: {:?}", case, events);

        let last_substantive = events.iter().rev().find(|e| e.kind() != "heartbeat");
        assert!(
            last_substantive.unwrap().is_terminal(),
            "case {}: terminal not last: {:?}",
            case,
            events
        );

        wait_unregistered(&registry, &task_id).await;
    }
}
