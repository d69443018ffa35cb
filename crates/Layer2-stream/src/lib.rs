//! # relay-stream
//!
//! Task lifecycle streaming engine for RelayCode. Turns an opaque,
//! poll-only remote task handle into a bounded, ordered event sequence.
//!
//! ## Components
//!
//! - **classify**: layered heuristic mapping free-form status strings onto
//!   lifecycle phases, including the defensive-completion rule
//! - **extract**: total result/failure/step extraction - a completed task
//!   always yields a non-empty human-readable string
//! - **TaskSession**: one cancellable polling loop per task, with tick
//!   budget, heartbeats, and guaranteed teardown
//! - **EventEmitter**: ordered event emission with exactly one terminal
//!   event per session
//! - **TaskRegistry**: concurrency-safe task id to session table

pub mod classify;
pub mod emitter;
pub mod event;
pub mod extract;
pub mod phase;
pub mod registry;
pub mod session;

pub use classify::{
    classify, COMPLETED_SYNONYMS, FAILED_SYNONYMS, IN_FLIGHT_STATUSES, PENDING_SYNONYMS,
};
pub use emitter::EventEmitter;
pub use event::{TaskEvent, TaskMetadata};
pub use extract::{
    extract, extract_failure, extract_step, DEFAULT_COMPLETED_MESSAGE, DEFAULT_FAILURE_MESSAGE,
    RESULT_KEYS,
};
pub use phase::{Phase, SessionState};
pub use registry::TaskRegistry;
pub use session::{SessionHandle, SessionStatus, TaskSession};
