//! pageswap - resource lifecycle reconciliation for in-place page swaps.
//!
//! When a page swaps its content region instead of reloading, the scripts
//! and stylesheets it carries must be diffed against what is already
//! running. This crate does that diff and drives per-feature lifecycles.
//!
//! # Modules
//!
//! - `core` - Keys, statuses, signal kinds, addresses
//! - `dom` - Arena document the reconcilers mutate
//! - `lifecycle` - Lifecycle bus and readiness registry
//! - `resource` - Script/stylesheet resources and the identity map
//! - `loader` - Network step seam
//! - `reconcile` - Script and stylesheet reconcilers
//! - `session` - Navigation tokens and full page swaps
//! - `config` - `pageswap.toml`
//! - `cli` - Command-line interface

pub mod logger;

pub mod cli;
pub mod config;
pub mod core;
pub mod dom;
pub mod lifecycle;
pub mod loader;
pub mod reconcile;
pub mod resource;
pub mod session;
