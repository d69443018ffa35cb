//! Config - unified configuration
//!
//! - `relay.rs` - `RelayConfig` (remote credentials + engine tuning)

mod relay;

pub use relay::{EngineConfig, RelayConfig, RemoteConfig};
