//! Events emitted over a task's lifetime
//!
//! The variant names and payload field names here are the stable contract
//! with whatever transport serializes them; wire framing is not this
//! crate's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Opaque caller context attached to a task at creation
///
/// Passed through on events untouched; the engine never interprets it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskMetadata {
    /// Conversation thread the task belongs to, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    /// Organization the task was created under, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,

    /// Anything else the caller wants echoed back
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub extra: HashMap<String, Value>,
}

impl TaskMetadata {
    pub fn with_thread_id(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }
}

/// One event in a session's ordered stream
///
/// Per session, exactly one of `Completed`/`Failed`/`Timeout` appears, and
/// it is the last non-heartbeat event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskEvent {
    /// The classified phase changed (or this is the first poll)
    Status {
        task_id: String,
        timestamp: DateTime<Utc>,
        status: String,
        tick: u32,
        #[serde(skip_serializing_if = "Option::is_none")]
        web_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },

    /// The task reported a new current step
    Step {
        task_id: String,
        timestamp: DateTime<Utc>,
        current_step: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },

    /// Terminal: the task finished with a result
    Completed {
        task_id: String,
        timestamp: DateTime<Utc>,
        result: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        web_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },

    /// Terminal: the task reported failure
    Failed {
        task_id: String,
        timestamp: DateTime<Utc>,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        web_url: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thread_id: Option<String>,
    },

    /// Non-terminal: a refresh attempt failed; polling continues
    Error {
        task_id: String,
        timestamp: DateTime<Utc>,
        error: String,
    },

    /// Terminal: the tick budget ran out before the task settled
    Timeout {
        task_id: String,
        timestamp: DateTime<Utc>,
        error: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        web_url: Option<String>,
    },

    /// Content-free keepalive between substantive events
    Heartbeat {
        task_id: String,
        timestamp: DateTime<Utc>,
    },
}

impl TaskEvent {
    /// The session this event belongs to
    pub fn task_id(&self) -> &str {
        match self {
            TaskEvent::Status { task_id, .. }
            | TaskEvent::Step { task_id, .. }
            | TaskEvent::Completed { task_id, .. }
            | TaskEvent::Failed { task_id, .. }
            | TaskEvent::Error { task_id, .. }
            | TaskEvent::Timeout { task_id, .. }
            | TaskEvent::Heartbeat { task_id, .. } => task_id,
        }
    }

    /// Whether this event ends the session's stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskEvent::Completed { .. } | TaskEvent::Failed { .. } | TaskEvent::Timeout { .. }
        )
    }

    /// Wire name of the event kind
    pub fn kind(&self) -> &'static str {
        match self {
            TaskEvent::Status { .. } => "status",
            TaskEvent::Step { .. } => "step",
            TaskEvent::Completed { .. } => "completed",
            TaskEvent::Failed { .. } => "failed",
            TaskEvent::Error { .. } => "error",
            TaskEvent::Timeout { .. } => "timeout",
            TaskEvent::Heartbeat { .. } => "heartbeat",
        }
    }
}
