//! Trait seams over the remote agent service
//!
//! The engine only ever sees these traits. `AgentClient`/`RemoteTask`
//! implement them over HTTP; tests implement them with scripted snapshots.

use crate::error::RemoteError;
use crate::snapshot::TaskSnapshot;
use async_trait::async_trait;

/// An in-flight unit of remote work, polled via `refresh`
#[async_trait]
pub trait TaskHandle: Send {
    /// Remote identifier, when the service assigned one
    fn id(&self) -> Option<String>;

    /// Pull the latest state of the task
    async fn refresh(&mut self) -> Result<TaskSnapshot, RemoteError>;
}

/// Capability to start remote agent tasks
#[async_trait]
pub trait AgentRunner: Send + Sync {
    /// Create a task from a prompt and return its handle
    async fn run(&self, prompt: &str) -> Result<Box<dyn TaskHandle>, RemoteError>;
}
