//! Event emission for one session
//!
//! Wraps the session's outbound channel and owns the single-terminal-event
//! invariant. Substantive events use a backpressured send so a slow
//! consumer throttles only its own session; heartbeats are dropped when the
//! channel is full since an undeliverable keepalive has no value.

use crate::event::{TaskEvent, TaskMetadata};
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::error;

/// Serializes one session's lifecycle into its ordered event sequence
pub struct EventEmitter {
    task_id: String,
    thread_id: Option<String>,
    tx: mpsc::Sender<TaskEvent>,
    terminal_sent: bool,
}

impl EventEmitter {
    pub fn new(task_id: impl Into<String>, metadata: &TaskMetadata, tx: mpsc::Sender<TaskEvent>) -> Self {
        Self {
            task_id: task_id.into(),
            thread_id: metadata.thread_id.clone(),
            tx,
            terminal_sent: false,
        }
    }

    /// Whether the terminal event has gone out
    pub fn terminal_sent(&self) -> bool {
        self.terminal_sent
    }

    /// Send an event, returning `false` when the consumer is gone
    ///
    /// A second terminal event for the same session is a programming error:
    /// it is debug-asserted, logged, and suppressed rather than delivered.
    async fn send(&mut self, event: TaskEvent) -> bool {
        if event.is_terminal() {
            if self.terminal_sent {
                debug_assert!(
                    false,
                    "terminal event already emitted for task {}",
                    self.task_id
                );
                error!(
                    task_id = %self.task_id,
                    kind = event.kind(),
                    "suppressing second terminal event"
                );
                return true;
            }
            self.terminal_sent = true;
        }

        self.tx.send(event).await.is_ok()
    }

    pub async fn status(&mut self, status: &str, tick: u32, web_url: Option<String>) -> bool {
        let event = TaskEvent::Status {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
            status: status.to_string(),
            tick,
            web_url,
            thread_id: self.thread_id.clone(),
        };
        self.send(event).await
    }

    pub async fn step(&mut self, current_step: String) -> bool {
        let event = TaskEvent::Step {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
            current_step,
            thread_id: self.thread_id.clone(),
        };
        self.send(event).await
    }

    pub async fn completed(&mut self, result: String, web_url: Option<String>) -> bool {
        let event = TaskEvent::Completed {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
            result,
            web_url,
            thread_id: self.thread_id.clone(),
        };
        self.send(event).await
    }

    pub async fn failed(&mut self, error: String, web_url: Option<String>) -> bool {
        let event = TaskEvent::Failed {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
            error,
            web_url,
            thread_id: self.thread_id.clone(),
        };
        self.send(event).await
    }

    pub async fn timeout(&mut self, error: String, web_url: Option<String>) -> bool {
        let event = TaskEvent::Timeout {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
            error,
            web_url,
        };
        self.send(event).await
    }

    /// Non-terminal refresh failure; the session keeps polling
    pub async fn transient_error(&mut self, error: String) -> bool {
        let event = TaskEvent::Error {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
            error,
        };
        self.send(event).await
    }

    /// Keepalive; dropped when the channel is full
    pub fn heartbeat(&self) {
        let _ = self.tx.try_send(TaskEvent::Heartbeat {
            task_id: self.task_id.clone(),
            timestamp: Utc::now(),
        });
    }
}
