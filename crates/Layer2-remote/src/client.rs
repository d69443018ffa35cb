//! HTTP client for the remote agent service

use crate::error::RemoteError;
use crate::handle::{AgentRunner, TaskHandle};
use crate::retry::{with_retry, RetryConfig};
use crate::snapshot::TaskSnapshot;
use async_trait::async_trait;
use relay_foundation::RemoteConfig;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
struct RunTaskRequest<'a> {
    prompt: &'a str,
}

/// Client for creating tasks against the remote agent service
pub struct AgentClient {
    client: Client,
    config: Arc<RemoteConfig>,
    retry_config: RetryConfig,
}

impl AgentClient {
    /// Create a new client from credentials
    pub fn new(config: RemoteConfig) -> Result<Self, RemoteError> {
        if !config.is_configured() {
            return Err(RemoteError::NotConfigured(
                "org_id and token are required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Unknown(e.to_string()))?;

        Ok(Self {
            client,
            config: Arc::new(config),
            retry_config: RetryConfig::default(),
        })
    }

    /// Override the retry behavior for task creation
    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.retry_config = retry_config;
        self
    }

    fn run_url(&self) -> String {
        format!(
            "{}/v1/organizations/{}/agent/run",
            self.config.base_url.trim_end_matches('/'),
            self.config.org_id
        )
    }

    /// Create a task from a prompt
    ///
    /// Creation is retried on transient failures; once the task exists the
    /// polling loop owns all further error handling.
    pub async fn run(&self, prompt: &str) -> Result<RemoteTask, RemoteError> {
        let url = self.run_url();
        let request = RunTaskRequest { prompt };

        let snapshot = with_retry(&self.retry_config, "create_task", || {
            fetch_snapshot(
                self.client
                    .post(&url)
                    .bearer_auth(&self.config.token)
                    .json(&request),
            )
        })
        .await?;

        info!(
            task_id = snapshot.id.as_deref().unwrap_or("<unassigned>"),
            status = %snapshot.status_normalized(),
            "created remote task"
        );

        Ok(RemoteTask {
            client: self.client.clone(),
            config: Arc::clone(&self.config),
            remote_id: snapshot.id.clone(),
            snapshot,
        })
    }
}

#[async_trait]
impl AgentRunner for AgentClient {
    async fn run(&self, prompt: &str) -> Result<Box<dyn TaskHandle>, RemoteError> {
        let task = AgentClient::run(self, prompt).await?;
        Ok(Box::new(task))
    }
}

/// Handle to one in-flight remote task
pub struct RemoteTask {
    client: Client,
    config: Arc<RemoteConfig>,
    remote_id: Option<String>,
    snapshot: TaskSnapshot,
}

impl RemoteTask {
    /// Latest snapshot pulled for this task
    pub fn snapshot(&self) -> &TaskSnapshot {
        &self.snapshot
    }

    fn task_url(&self, id: &str) -> String {
        format!(
            "{}/v1/organizations/{}/agent/run/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.org_id,
            id
        )
    }
}

#[async_trait]
impl TaskHandle for RemoteTask {
    fn id(&self) -> Option<String> {
        self.remote_id.clone()
    }

    async fn refresh(&mut self) -> Result<TaskSnapshot, RemoteError> {
        let Some(id) = self.remote_id.clone() else {
            // Some task implementations answer the create call with an
            // inline result and never assign an id; re-serving the creation
            // snapshot lets the classifier finish the session.
            debug!("refresh on id-less task, returning creation snapshot");
            return Ok(self.snapshot.clone());
        };

        let url = self.task_url(&id);
        let snapshot =
            fetch_snapshot(self.client.get(&url).bearer_auth(&self.config.token)).await?;

        self.snapshot = snapshot.clone();
        Ok(snapshot)
    }
}

/// Send a request and parse the response body as a task snapshot
async fn fetch_snapshot(request: reqwest::RequestBuilder) -> Result<TaskSnapshot, RemoteError> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(RemoteError::from_http_status(status.as_u16(), &body));
    }

    serde_json::from_str(&body).map_err(|e| RemoteError::InvalidResponse(e.to_string()))
}
