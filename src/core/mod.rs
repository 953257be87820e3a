//! Core types - pure abstractions shared across the codebase.

mod address;
mod key;

pub use address::{Address, Environment};
pub use key::{Key, SignalKind, Status};
