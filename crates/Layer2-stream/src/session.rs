//! Streaming session - one cancellable polling loop per task
//!
//! A session owns the only blocking points in the engine: the remote
//! `refresh` call and the inter-poll sleep. Everything observable leaves
//! through the session's event channel; everything shared lives in the
//! registry.

use crate::classify::classify;
use crate::emitter::EventEmitter;
use crate::event::{TaskEvent, TaskMetadata};
use crate::extract::{extract, extract_failure, extract_step};
use crate::phase::{Phase, SessionState};
use crate::registry::TaskRegistry;
use chrono::{DateTime, Utc};
use relay_foundation::{EngineConfig, Result};
use relay_remote::{TaskHandle, TaskSnapshot};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Shared view of a session, as stored in the registry
pub struct SessionHandle {
    task_id: String,
    created_at: DateTime<Utc>,
    metadata: TaskMetadata,
    cancel: CancellationToken,
    status: RwLock<SessionStatus>,
    receiver: Mutex<Option<mpsc::Receiver<TaskEvent>>>,
}

/// Last-known progress of a session, for non-streaming queries
#[derive(Debug, Clone)]
pub struct SessionStatus {
    /// Engine-side lifecycle state
    pub state: SessionState,

    /// Most recent remote snapshot, once one was pulled
    pub snapshot: Option<TaskSnapshot>,
}

impl SessionHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn metadata(&self) -> &TaskMetadata {
        &self.metadata
    }

    /// Request cooperative cancellation; the loop exits within one poll
    /// interval
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Last-known state and snapshot
    pub async fn status(&self) -> SessionStatus {
        self.status.read().await.clone()
    }

    /// Take the event receiver; only one consumer may attach
    pub async fn take_receiver(&self) -> Option<mpsc::Receiver<TaskEvent>> {
        self.receiver.lock().await.take()
    }

    async fn store(&self, state: SessionState, snapshot: Option<TaskSnapshot>) {
        let mut status = self.status.write().await;
        status.state = state;
        if let Some(snapshot) = snapshot {
            status.snapshot = Some(snapshot);
        }
    }
}

/// One task's polling loop; the unit of concurrency in the engine
pub struct TaskSession;

impl TaskSession {
    /// Register a session for `handle` and spawn its polling loop
    ///
    /// The registry insertion happens before the loop starts, so a
    /// duplicate task id fails the whole operation and nothing is spawned.
    pub async fn spawn(
        handle: Box<dyn TaskHandle>,
        metadata: TaskMetadata,
        config: EngineConfig,
        registry: TaskRegistry,
    ) -> Result<Arc<SessionHandle>> {
        config.validate()?;

        let task_id = handle
            .id()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("task_{}", Utc::now().timestamp_millis()));

        let (tx, rx) = mpsc::channel(config.channel_capacity);

        let session = Arc::new(SessionHandle {
            task_id: task_id.clone(),
            created_at: Utc::now(),
            metadata: metadata.clone(),
            cancel: CancellationToken::new(),
            status: RwLock::new(SessionStatus {
                state: SessionState::Initiated,
                snapshot: None,
            }),
            receiver: Mutex::new(Some(rx)),
        });

        registry.register(Arc::clone(&session)).await?;

        let emitter = EventEmitter::new(task_id.as_str(), &metadata, tx);
        tokio::spawn(run_session(
            handle,
            Arc::clone(&session),
            emitter,
            config,
            registry,
        ));

        info!(task_id = %task_id, "session started");
        Ok(session)
    }
}

/// How the polling loop ended
enum SessionExit {
    /// The remote task reached a terminal phase
    Terminal(SessionState),

    /// Cancelled by the caller or a disconnect signal
    Cancelled,

    /// The consumer dropped its stream mid-session
    Disconnected,

    /// Tick budget exhausted without a terminal phase
    BudgetExhausted,
}

async fn run_session(
    mut handle: Box<dyn TaskHandle>,
    session: Arc<SessionHandle>,
    mut emitter: EventEmitter,
    config: EngineConfig,
    registry: TaskRegistry,
) {
    // Runs the unregister even if this task panics mid-poll
    let mut guard = CleanupGuard {
        registry: registry.clone(),
        task_id: session.task_id().to_string(),
        armed: true,
    };

    let cancel = session.cancel.clone();
    let task_id = session.task_id().to_string();

    let now = Instant::now();
    let mut poll = interval_at(now, config.poll_interval());
    poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut heartbeat = interval_at(now + config.heartbeat_interval(), config.heartbeat_interval());
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut tick: u32 = 0;
    let mut prev_phase: Option<Phase> = None;
    let mut last_emitted_step: Option<String> = None;

    let exit = loop {
        tokio::select! {
            _ = cancel.cancelled() => break SessionExit::Cancelled,

            _ = heartbeat.tick() => {
                emitter.heartbeat();
            }

            _ = poll.tick() => {
                if tick >= config.max_ticks {
                    break SessionExit::BudgetExhausted;
                }
                tick += 1;

                let snapshot = match handle.refresh().await {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        warn!(task_id = %task_id, tick, error = %e, "refresh failed, continuing");
                        if !emitter
                            .transient_error(format!("Failed to refresh task: {}", e))
                            .await
                        {
                            break SessionExit::Disconnected;
                        }
                        continue;
                    }
                };

                let phase = classify(&snapshot, config.defensive_completion);
                if phase == Phase::Unknown {
                    warn!(task_id = %task_id, status = %snapshot.status_normalized(), "unrecognized task status");
                }

                let state = SessionState::from_phase(phase);
                session.store(state, Some(snapshot.clone())).await;

                if prev_phase != Some(phase) {
                    debug!(task_id = %task_id, tick, ?phase, "phase transition");
                    if !emitter
                        .status(&snapshot.status_normalized(), tick, snapshot.web_url.clone())
                        .await
                    {
                        break SessionExit::Disconnected;
                    }
                    prev_phase = Some(phase);
                }

                if let Some(step) = extract_step(&snapshot) {
                    if last_emitted_step.as_deref() != Some(step.as_str()) {
                        if !emitter.step(step.clone()).await {
                            break SessionExit::Disconnected;
                        }
                        last_emitted_step = Some(step);
                    }
                }

                match phase {
                    Phase::Completed => {
                        let result = extract(&snapshot);
                        emitter.completed(result, snapshot.web_url.clone()).await;
                        break SessionExit::Terminal(SessionState::Completed);
                    }
                    Phase::Failed => {
                        let error = extract_failure(&snapshot);
                        emitter.failed(error, snapshot.web_url.clone()).await;
                        break SessionExit::Terminal(SessionState::Failed);
                    }
                    _ => {}
                }
            }
        }
    };

    let final_state = match exit {
        SessionExit::Terminal(state) => {
            info!(task_id = %task_id, %state, "session reached terminal phase");
            state
        }
        SessionExit::Cancelled => {
            info!(task_id = %task_id, "session cancelled");
            SessionState::Cancelled
        }
        SessionExit::Disconnected => {
            info!(task_id = %task_id, "consumer disconnected, tearing down");
            cancel.cancel();
            SessionState::Cancelled
        }
        SessionExit::BudgetExhausted => {
            finish_exhausted_session(&mut handle, &session, &mut emitter, &config, &task_id).await
        }
    };

    session.store(final_state, None).await;
    guard.armed = false;
    registry.unregister(&task_id).await;
}

/// Settle a session whose tick budget ran out
///
/// One final refresh before giving up: task implementations that populate
/// output without ever flipping their status string would otherwise time
/// out while holding a perfectly good result.
async fn finish_exhausted_session(
    handle: &mut Box<dyn TaskHandle>,
    session: &Arc<SessionHandle>,
    emitter: &mut EventEmitter,
    config: &EngineConfig,
    task_id: &str,
) -> SessionState {
    let latest = match handle.refresh().await {
        Ok(snapshot) => {
            session
                .store(session.status().await.state, Some(snapshot.clone()))
                .await;
            Some(snapshot)
        }
        Err(e) => {
            warn!(task_id = %task_id, error = %e, "final refresh failed");
            session.status().await.snapshot
        }
    };

    if let Some(snapshot) = &latest {
        let completed = classify(snapshot, config.defensive_completion) == Phase::Completed
            || (config.defensive_completion && snapshot.is_result_bearing());
        if completed {
            info!(task_id = %task_id, "salvaged result at tick budget");
            emitter
                .completed(extract(snapshot), snapshot.web_url.clone())
                .await;
            return SessionState::Completed;
        }
    }

    warn!(task_id = %task_id, max_ticks = config.max_ticks, "session timed out");
    let budget_secs = (config.max_ticks as u64 * config.poll_interval_ms) / 1000;
    emitter
        .timeout(
            format!(
                "Task polling timeout after {}s. Task may still be running.",
                budget_secs
            ),
            latest.and_then(|s| s.web_url),
        )
        .await;
    SessionState::TimedOut
}

/// Removes the session from the registry when the loop task dies without
/// reaching its own teardown
struct CleanupGuard {
    registry: TaskRegistry,
    task_id: String,
    armed: bool,
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let registry = self.registry.clone();
        let task_id = std::mem::take(&mut self.task_id);
        if let Ok(rt) = tokio::runtime::Handle::try_current() {
            rt.spawn(async move {
                registry.unregister(&task_id).await;
            });
        }
    }
}
