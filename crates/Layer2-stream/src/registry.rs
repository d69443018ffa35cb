//! Process-wide session table
//!
//! Shared by all sessions and by inbound stream-attach requests. Insertion
//! happens synchronously at task creation; removal happens from the owning
//! session's teardown path. There is no eviction policy beyond that.

use crate::session::SessionHandle;
use relay_foundation::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// Mapping of task id to live session
#[derive(Clone, Default)]
pub struct TaskRegistry {
    sessions: Arc<RwLock<HashMap<String, Arc<SessionHandle>>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session; a duplicate task id is fatal to the caller
    pub async fn register(&self, session: Arc<SessionHandle>) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let task_id = session.task_id().to_string();

        if sessions.contains_key(&task_id) {
            return Err(Error::DuplicateTask(task_id));
        }

        sessions.insert(task_id, session);
        Ok(())
    }

    /// Remove a session; absent ids are not an error
    pub async fn unregister(&self, task_id: &str) -> bool {
        let removed = self.sessions.write().await.remove(task_id).is_some();
        if removed {
            debug!(task_id = %task_id, "session unregistered");
        }
        removed
    }

    /// Look up a session by task id
    pub async fn get(&self, task_id: &str) -> Option<Arc<SessionHandle>> {
        self.sessions.read().await.get(task_id).cloned()
    }

    pub async fn contains(&self, task_id: &str) -> bool {
        self.sessions.read().await.contains_key(task_id)
    }

    /// All live sessions, in no particular order
    pub async fn list(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.read().await.values().cloned().collect()
    }

    pub async fn count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
