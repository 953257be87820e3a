//! Lifecycle Module
//!
//! Everything a feature module sees of a navigation.
//!
//! # Modules
//!
//! - `bus` - Publish/subscribe of init/load/unload/destroy per feature key
//! - `readiness` - Asynchronous "ready" signals and the per-pass registry

pub mod bus;
pub mod readiness;

pub use bus::{Context, Handlers, LifecycleBus, Signal};
pub use readiness::{LoadError, ReadinessRegistry, ReadinessSet, Readiness, ReadyState, Settle};
