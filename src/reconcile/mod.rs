//! Resource Reconciliation
//!
//! Diffs the resources on the page against those a new page needs and
//! drives the lifecycle bus accordingly.
//!
//! # Modules
//!
//! - `scripts` - Removal/addition phases and dependency-ordered injection
//! - `styles` - Stylesheet diffing in declared order
//! - `inline` - Rebuilding inline scripts so they run again
//! - `join` - Readiness joins under a [`JoinPolicy`]
//! - `error` - [`ReconcileError`]
//!
//! # Locking
//!
//! A pass takes the document lock, then the status lock, computes every
//! mutation and the signals to publish, releases both, and only then
//! publishes. Handlers are free to touch the document.

mod error;
mod inline;
mod join;
mod scripts;
mod styles;

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::core::{Environment, Key, Status};
use crate::dom::{NodeId, NodeTable, SharedDocument};
use crate::lifecycle::{LifecycleBus, Readiness, ReadinessSet};
use crate::loader::{ImmediateLoader, ResourceLoader};
use crate::resource::ScriptResource;

pub use error::ReconcileError;
pub use inline::{is_executable, rebuild_inline_scripts};
pub use join::{JoinPolicy, join};

/// Result of a script pass.
#[derive(Debug, Clone)]
pub struct ScriptOutcome {
    /// Retained old scripts (old order), then synthesized ones.
    pub on_page: Vec<ScriptResource>,
    /// Every readiness signal of the pass.
    pub readiness: ReadinessSet,
}

/// Per-element state shared by overlapping passes.
#[derive(Debug, Default)]
struct ScriptState {
    status: NodeTable<Status>,
    /// Loads of synthesized scripts that have not settled yet.
    inflight: NodeTable<Readiness>,
    /// Keys initialized since their script last appeared on the page.
    active: FxHashSet<Key>,
}

impl ScriptState {
    /// Claim `key` for an `init`; false if it is already active.
    fn activate(&mut self, key: &Key) -> bool {
        self.active.insert(key.clone())
    }
}

// =============================================================================
// Reconciler
// =============================================================================

/// Owns the lifecycle bus and the per-element tables for one page.
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Reconciler {
    doc: SharedDocument,
    bus: Arc<LifecycleBus>,
    env: Environment,
    loader: Arc<dyn ResourceLoader>,
    policy: JoinPolicy,
    state: Arc<Mutex<ScriptState>>,
}

impl Reconciler {
    /// Create a reconciler with an immediate loader and fail-fast joins.
    pub fn new(doc: SharedDocument, bus: Arc<LifecycleBus>, env: Environment) -> Self {
        Self {
            doc,
            bus,
            env,
            loader: Arc::new(ImmediateLoader),
            policy: JoinPolicy::default(),
            state: Arc::default(),
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn ResourceLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_policy(mut self, policy: JoinPolicy) -> Self {
        self.policy = policy;
        self
    }

    #[inline]
    pub fn document(&self) -> &SharedDocument {
        &self.doc
    }

    #[inline]
    pub fn bus(&self) -> &Arc<LifecycleBus> {
        &self.bus
    }

    #[inline]
    pub fn environment(&self) -> &Environment {
        &self.env
    }

    #[inline]
    pub fn policy(&self) -> JoinPolicy {
        self.policy
    }

    /// Lifecycle status of a script element (`Unloaded` if never seen).
    pub fn status(&self, node: NodeId) -> Status {
        self.state
            .lock()
            .status
            .get(node)
            .copied()
            .unwrap_or_default()
    }

    /// Mark scripts present at first page load as active.
    ///
    /// They already ran, so their keys count as initialized.
    pub fn mark_loaded(&self, scripts: &[ScriptResource]) {
        let mut state = self.state.lock();
        for script in scripts {
            state.status.insert(script.node, Status::Loaded);
            if let Some(key) = self.eligible_key(script) {
                state.active.insert(key.clone());
            }
        }
    }

    /// Check if `key` was initialized and not destroyed since.
    ///
    /// Subscribing to the bus does not activate a key; only a script with
    /// that key appearing on the page does.
    pub fn is_active(&self, key: &Key) -> bool {
        self.state.lock().active.contains(key)
    }

    /// The key of a script, if it takes part in the lifecycle.
    ///
    /// Requires a same-origin address and a key.
    pub fn eligible_key<'a>(&self, script: &'a ScriptResource) -> Option<&'a Key> {
        script
            .key
            .as_ref()
            .filter(|_| self.env.is_same_origin(&script.address))
    }

    /// Check if the environment opts this script out of execution.
    fn is_opted_out(&self, script: &ScriptResource) -> bool {
        if self.env.supports_modules() {
            script.no_module
        } else {
            script.is_module()
        }
    }

    pub(crate) fn runtime(&self) -> Result<tokio::runtime::Handle, ReconcileError> {
        tokio::runtime::Handle::try_current().map_err(|_| ReconcileError::NoRuntime)
    }
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("base", &self.env.base().as_str())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
