//! Readiness signals and the per-pass registry.
//!
//! A `Readiness` is a cloneable view of one resource's load. It starts
//! `Pending` and settles exactly once, to `Ready` or `Failed`. Dependent
//! scripts wait on these before they are inserted.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tokio::sync::watch;

use crate::core::{Address, Key};
use crate::debug;

/// Why a readiness signal failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to load `{address}`: {reason}")]
    Network { address: Address, reason: Arc<str> },

    #[error("dependency `{key}` failed: {source}")]
    Dependency {
        key: Key,
        #[source]
        source: Box<LoadError>,
    },

    #[error("load of `{0}` was abandoned before it settled")]
    Abandoned(Arc<str>),
}

impl LoadError {
    pub fn network(address: &Address, reason: impl AsRef<str>) -> Self {
        Self::Network {
            address: address.clone(),
            reason: Arc::from(reason.as_ref()),
        }
    }

    pub fn dependency(key: &Key, source: LoadError) -> Self {
        Self::Dependency {
            key: key.clone(),
            source: Box::new(source),
        }
    }
}

/// Observable state of a readiness signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadyState {
    Pending,
    Ready,
    Failed(LoadError),
}

impl ReadyState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

// =============================================================================
// Readiness
// =============================================================================

/// Cloneable, awaitable completion marker for one resource.
#[derive(Debug, Clone)]
pub struct Readiness {
    label: Arc<str>,
    rx: watch::Receiver<ReadyState>,
}

/// Producer side of a [`Readiness`]. Settling consumes it.
#[derive(Debug)]
pub struct Settle {
    tx: watch::Sender<ReadyState>,
}

impl Readiness {
    /// A signal that is already satisfied (no network step needed).
    pub fn satisfied(label: impl AsRef<str>) -> Self {
        let (_tx, rx) = watch::channel(ReadyState::Ready);
        Self {
            label: Arc::from(label.as_ref()),
            rx,
        }
    }

    /// A pending signal plus the handle that settles it.
    pub fn pending(label: impl AsRef<str>) -> (Settle, Self) {
        let (tx, rx) = watch::channel(ReadyState::Pending);
        let readiness = Self {
            label: Arc::from(label.as_ref()),
            rx,
        };
        (Settle { tx }, readiness)
    }

    /// What this signal tracks (an address or key), for diagnostics.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Current state without waiting.
    pub fn state(&self) -> ReadyState {
        self.rx.borrow().clone()
    }

    pub fn is_settled(&self) -> bool {
        !self.rx.borrow().is_pending()
    }

    /// Wait until the signal settles.
    ///
    /// A signal whose producer is dropped while pending fails as abandoned.
    pub async fn wait(&self) -> Result<(), LoadError> {
        let mut rx = self.rx.clone();
        loop {
            let state = rx.borrow_and_update().clone();
            match state {
                ReadyState::Ready => return Ok(()),
                ReadyState::Failed(err) => return Err(err),
                ReadyState::Pending => {}
            }
            if rx.changed().await.is_err() {
                // Producer gone: take whatever it left behind
                return match rx.borrow().clone() {
                    ReadyState::Ready => Ok(()),
                    ReadyState::Failed(err) => Err(err),
                    ReadyState::Pending => Err(LoadError::Abandoned(Arc::clone(&self.label))),
                };
            }
        }
    }
}

impl Settle {
    pub fn ready(self) {
        self.tx.send_replace(ReadyState::Ready);
    }

    pub fn fail(self, err: LoadError) {
        self.tx.send_replace(ReadyState::Failed(err));
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Readiness signals of one reconciliation pass.
///
/// First write per key wins. Every recorded signal is kept for the
/// aggregate join, keyed or not.
#[derive(Debug, Default)]
pub struct ReadinessRegistry {
    by_key: FxHashMap<Key, Readiness>,
    all: Vec<Readiness>,
}

impl ReadinessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a signal. Keyless resources only join the aggregate.
    pub fn record(&mut self, key: Option<&Key>, readiness: Readiness) {
        if let Some(key) = key {
            self.by_key
                .entry(key.clone())
                .or_insert_with(|| readiness.clone());
        }
        self.all.push(readiness);
    }

    /// Signal for `key`; keys this pass does not manage count as satisfied.
    pub fn get(&self, key: &Key) -> Readiness {
        match self.by_key.get(key) {
            Some(readiness) => readiness.clone(),
            None => {
                debug!("scripts"; "dependency `{}` is not managed by this pass, treating as ready", key);
                Readiness::satisfied(key.as_str())
            }
        }
    }

    pub fn contains(&self, key: &Key) -> bool {
        self.by_key.contains_key(key)
    }

    pub fn into_set(self) -> ReadinessSet {
        ReadinessSet { signals: self.all }
    }
}

/// Every readiness signal of a pass, in recording order.
#[derive(Debug, Clone, Default)]
pub struct ReadinessSet {
    signals: Vec<Readiness>,
}

impl ReadinessSet {
    pub fn signals(&self) -> &[Readiness] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Wait for every signal; fails as soon as any member fails.
    pub async fn settled(&self) -> Result<(), LoadError> {
        let waits = self.signals.iter().cloned().map(|r| async move { r.wait().await });
        crate::reconcile::join(waits, crate::reconcile::JoinPolicy::FailFast).await
    }
}
