//! # relay-gateway
//!
//! Service boundary for RelayCode. A serving layer (HTTP, websocket,
//! whatever) talks to [`TaskService`] and never touches the engine or the
//! remote client directly:
//!
//! ```ignore
//! use relay_foundation::RelayConfig;
//! use relay_gateway::TaskService;
//! use relay_stream::TaskMetadata;
//!
//! let service = TaskService::from_config(&RelayConfig::from_env())?;
//!
//! let task_id = service
//!     .start_task("Summarize this repository", TaskMetadata::default())
//!     .await?;
//!
//! let mut events = service.attach_stream(&task_id).await?;
//! while let Some(event) = events.next().await {
//!     // serialize and forward to the client
//! }
//! ```

pub mod service;

pub use service::{EventStream, TaskService, TaskStatusView};

// Re-export the types a serving layer needs alongside the service
pub use relay_foundation::{EngineConfig, Error, RelayConfig, RemoteConfig, Result};
pub use relay_stream::{SessionState, TaskEvent, TaskMetadata};
