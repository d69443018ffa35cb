//! # relay-foundation
//!
//! Foundation layer for RelayCode:
//! - Error: central `Error` enum and `Result` alias
//! - Config: unified settings (`RelayConfig`, `RemoteConfig`, `EngineConfig`)
//!
//! Higher layers (`relay-remote`, `relay-stream`, `relay-gateway`) depend on
//! this crate and nothing below it.

pub mod config;
pub mod error;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config
// ============================================================================
pub use config::{EngineConfig, RelayConfig, RemoteConfig};
