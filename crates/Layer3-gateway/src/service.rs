//! Task service - the boundary consumed by the serving layer
//!
//! HTTP routing, wire framing, and credential plumbing live above this
//! crate; everything here speaks task ids, event streams, and status views.

use chrono::{DateTime, Utc};
use futures::Stream;
use relay_foundation::{EngineConfig, Error, RelayConfig, Result};
use relay_remote::{AgentClient, AgentRunner};
use relay_stream::{
    extract, extract_failure, SessionState, TaskEvent, TaskMetadata, TaskRegistry, TaskSession,
};
use serde::Serialize;
use std::pin::Pin;
use std::sync::Arc;
use tracing::info;

/// Ordered event sequence for one task, ending at its terminal event
pub type EventStream = Pin<Box<dyn Stream<Item = TaskEvent> + Send>>;

/// Last-known snapshot of a task, for non-streaming polling
#[derive(Debug, Clone, Serialize)]
pub struct TaskStatusView {
    pub task_id: String,

    /// Raw (normalized) status string from the remote service
    pub status: String,

    /// Engine-side lifecycle state
    pub state: SessionState,

    /// Extracted result, present once the task completed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,

    /// Extracted failure message, present once the task failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,

    pub created_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_id: Option<String>,
}

/// Front door of the engine: start, stream, query, and cancel tasks
#[derive(Clone)]
pub struct TaskService {
    runner: Arc<dyn AgentRunner>,
    registry: TaskRegistry,
    config: EngineConfig,
}

impl TaskService {
    /// Create a service over an injected runner (tests use scripted ones)
    pub fn new(runner: Arc<dyn AgentRunner>, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            runner,
            registry: TaskRegistry::new(),
            config,
        })
    }

    /// Create a service backed by the real remote agent client
    pub fn from_config(config: &RelayConfig) -> Result<Self> {
        let client = AgentClient::new(config.remote.clone()).map_err(Error::from)?;
        Self::new(Arc::new(client), config.engine.clone())
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    /// Create a remote task and start streaming it
    ///
    /// Returns the task id to attach a stream to. A duplicate task id is
    /// fatal to this call and leaves the existing session untouched.
    pub async fn start_task(&self, prompt: &str, metadata: TaskMetadata) -> Result<String> {
        let handle = self.runner.run(prompt).await.map_err(Error::from)?;

        let session = TaskSession::spawn(
            handle,
            metadata,
            self.config.clone(),
            self.registry.clone(),
        )
        .await?;

        info!(task_id = %session.task_id(), "task started");
        Ok(session.task_id().to_string())
    }

    /// Attach to a task's event stream
    ///
    /// Yields events until the terminal event, then ends. Dropping the
    /// stream counts as a disconnect and tears the session down. Only one
    /// consumer may attach per session.
    pub async fn attach_stream(&self, task_id: &str) -> Result<EventStream> {
        let session = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

        let mut rx = session
            .take_receiver()
            .await
            .ok_or_else(|| Error::Stream(format!("Task {} already has a consumer", task_id)))?;

        Ok(Box::pin(async_stream::stream! {
            while let Some(event) = rx.recv().await {
                let terminal = event.is_terminal();
                yield event;
                if terminal {
                    break;
                }
            }
        }))
    }

    /// Last-known status of a live task
    pub async fn get_status(&self, task_id: &str) -> Result<TaskStatusView> {
        let session = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

        Ok(view_of(&session).await)
    }

    /// All live tasks, for monitoring
    pub async fn list_tasks(&self) -> Vec<TaskStatusView> {
        let mut views = Vec::new();
        for session in self.registry.list().await {
            views.push(view_of(&session).await);
        }
        views
    }

    /// Revoke a task: polling halts within one interval and the id is
    /// released immediately
    pub async fn cancel(&self, task_id: &str) -> Result<()> {
        let session = self
            .registry
            .get(task_id)
            .await
            .ok_or_else(|| Error::NotFound(format!("Task {} not found", task_id)))?;

        session.cancel();
        self.registry.unregister(task_id).await;

        info!(task_id = %task_id, "task cancelled");
        Ok(())
    }

    /// Drive a task to its end without streaming
    ///
    /// Returns the extracted result on completion; failures and timeouts
    /// surface as errors.
    pub async fn wait(&self, task_id: &str) -> Result<String> {
        use futures::StreamExt;

        let mut stream = self.attach_stream(task_id).await?;

        while let Some(event) = stream.next().await {
            match event {
                TaskEvent::Completed { result, .. } => return Ok(result),
                TaskEvent::Failed { error, .. } => {
                    return Err(Error::Task(format!("Task failed: {}", error)))
                }
                TaskEvent::Timeout { error, .. } => return Err(Error::Timeout(error)),
                _ => {}
            }
        }

        // stream ended without a terminal event: the session was revoked
        Err(Error::Cancelled)
    }
}

async fn view_of(session: &relay_stream::SessionHandle) -> TaskStatusView {
    let status = session.status().await;
    let metadata = session.metadata();

    let raw_status = status
        .snapshot
        .as_ref()
        .map(|s| s.status_normalized())
        .unwrap_or_else(|| "unknown".to_string());

    let result = (status.state == SessionState::Completed).then(|| {
        status
            .snapshot
            .as_ref()
            .map(extract)
            .unwrap_or_else(|| relay_stream::DEFAULT_COMPLETED_MESSAGE.to_string())
    });

    let error = (status.state == SessionState::Failed).then(|| {
        status
            .snapshot
            .as_ref()
            .map(extract_failure)
            .unwrap_or_else(|| relay_stream::DEFAULT_FAILURE_MESSAGE.to_string())
    });

    TaskStatusView {
        task_id: session.task_id().to_string(),
        status: raw_status,
        state: status.state,
        result,
        error,
        web_url: status.snapshot.as_ref().and_then(|s| s.web_url.clone()),
        created_at: session.created_at(),
        thread_id: metadata.thread_id.clone(),
        org_id: metadata.org_id.clone(),
    }
}
