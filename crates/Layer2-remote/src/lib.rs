//! # relay-remote
//!
//! Client layer for the remote agent service. The service is consumed as an
//! opaque capability: create a task from a prompt, then pull its state with
//! `refresh`. Completion semantics of the returned snapshots are loose;
//! interpreting them is the job of `relay-stream`, not this crate.

pub mod client;
pub mod error;
pub mod handle;
pub mod retry;
pub mod snapshot;

pub use client::{AgentClient, RemoteTask};
pub use error::RemoteError;
pub use handle::{AgentRunner, TaskHandle};
pub use retry::{with_retry, RetryClassification, RetryConfig, RetryableError};
pub use snapshot::{value_non_empty, TaskSnapshot};
