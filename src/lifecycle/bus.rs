//! Lifecycle Bus
//!
//! Typed publish/subscribe keyed by `(SignalKind, Key)`.
//!
//! # Dispatch
//!
//! | Signal          | Handlers invoked                           |
//! |-----------------|--------------------------------------------|
//! | `init`          | `on_init()`, then `on_load(Document)`      |
//! | `load(ctx)`     | `on_load(ctx)`                             |
//! | `unload(ctx)`   | `on_unload(ctx)`                           |
//! | `destroy`       | `on_unload(Document)`, then `on_destroy()` |
//!
//! Handlers run synchronously, in registration order, outside any lock, so
//! a handler may subscribe or publish again.

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;

use crate::core::{Key, SignalKind};
use crate::dom::NodeId;
use crate::{debug, log};

/// Page region a load/unload applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Context {
    /// The whole document.
    #[default]
    Document,
    /// A swapped content region.
    Region(NodeId),
}

impl Context {
    pub fn region(node: NodeId) -> Self {
        Self::Region(node)
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Document => f.write_str("document"),
            Self::Region(node) => write!(f, "region {node}"),
        }
    }
}

/// One published signal, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub kind: SignalKind,
    pub key: Key,
    pub context: Context,
}

type ContextHandler = Arc<dyn Fn(Context) + Send + Sync>;
type PlainHandler = Arc<dyn Fn() + Send + Sync>;
type Observer = Arc<dyn Fn(&Signal) + Send + Sync>;

// =============================================================================
// Handlers
// =============================================================================

/// Handler bundle registered for one key. Every handler is optional.
///
/// ```ignore
/// bus.subscribe("gallery", Handlers::new()
///     .on_load(|ctx| bind_gallery(ctx))
///     .on_unload(|ctx| unbind_gallery(ctx)));
/// ```
#[derive(Clone, Default)]
pub struct Handlers {
    on_init: Option<PlainHandler>,
    on_load: Option<ContextHandler>,
    on_unload: Option<ContextHandler>,
    on_destroy: Option<PlainHandler>,
}

impl Handlers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_init(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_init = Some(Arc::new(f));
        self
    }

    pub fn on_load(mut self, f: impl Fn(Context) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(f));
        self
    }

    pub fn on_unload(mut self, f: impl Fn(Context) + Send + Sync + 'static) -> Self {
        self.on_unload = Some(Arc::new(f));
        self
    }

    pub fn on_destroy(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_destroy = Some(Arc::new(f));
        self
    }

    fn init(&self) {
        if let Some(f) = &self.on_init {
            f();
        }
    }

    fn load(&self, context: Context) {
        if let Some(f) = &self.on_load {
            f(context);
        }
    }

    fn unload(&self, context: Context) {
        if let Some(f) = &self.on_unload {
            f(context);
        }
    }

    fn destroy(&self) {
        if let Some(f) = &self.on_destroy {
            f();
        }
    }

    fn dispatch(&self, kind: SignalKind, context: Context) {
        match kind {
            SignalKind::Init => {
                self.init();
                self.load(Context::Document);
            }
            SignalKind::Load => self.load(context),
            SignalKind::Unload => self.unload(context),
            SignalKind::Destroy => {
                self.unload(Context::Document);
                self.destroy();
            }
        }
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_init", &self.on_init.is_some())
            .field("on_load", &self.on_load.is_some())
            .field("on_unload", &self.on_unload.is_some())
            .field("on_destroy", &self.on_destroy.is_some())
            .finish()
    }
}

// =============================================================================
// Bus
// =============================================================================

/// Subscriber table and wildcard observers.
///
/// The bus delivers every signal it is given. Deciding when a key is
/// initialized or destroyed belongs to the reconciler, which knows what is
/// on the page.
#[derive(Default)]
pub struct LifecycleBus {
    subscribers: RwLock<FxHashMap<Key, Vec<Arc<Handlers>>>>,
    observers: RwLock<Vec<Observer>>,
}

impl LifecycleBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler bundle and run its init + load immediately.
    ///
    /// Only the new bundle runs; other subscribers of `key` are not told.
    /// Re-registering adds another independent subscriber.
    pub fn subscribe(&self, key: impl Into<Key>, handlers: Handlers) {
        let key = key.into();
        let handlers = Arc::new(handlers);
        self.subscribers
            .write()
            .entry(key.clone())
            .or_default()
            .push(Arc::clone(&handlers));

        debug!("bus"; "subscribed to {}", key);
        Self::guarded(SignalKind::Init, &key, || {
            handlers.dispatch(SignalKind::Init, Context::Document);
        });
    }

    /// Register a wildcard observer that sees every published signal.
    pub fn observe(&self, f: impl Fn(&Signal) + Send + Sync + 'static) {
        self.observers.write().push(Arc::new(f));
    }

    /// Publish a signal to every subscriber of `key`.
    pub fn publish(&self, kind: SignalKind, key: &Key, context: Context) {
        let signal = Signal {
            kind,
            key: key.clone(),
            context,
        };
        let observers = self.observers.read().clone();
        for observer in &observers {
            observer(&signal);
        }

        // Snapshot so handlers can re-enter the bus
        let handlers = self.handlers_for(key);
        debug!("bus"; "{} {} ({} subscribers, {})", kind, key, handlers.len(), context);
        Self::guarded(kind, key, || {
            for handler in &handlers {
                handler.dispatch(kind, context);
            }
        });
    }

    /// Send `load(context)` to every subscriber of every key.
    ///
    /// Used when part of the current page was replaced without a navigation.
    pub fn publish_partial(&self, context: Context) {
        let all: Vec<(Key, Vec<Arc<Handlers>>)> = self
            .subscribers
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (key, handlers) in all {
            Self::guarded(SignalKind::Load, &key, || {
                for handler in &handlers {
                    handler.load(context);
                }
            });
        }
    }

    pub fn subscriber_count(&self, key: &Key) -> usize {
        self.subscribers.read().get(key).map_or(0, Vec::len)
    }

    fn handlers_for(&self, key: &Key) -> Vec<Arc<Handlers>> {
        self.subscribers
            .read()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Run handlers for one key; a panic stops this key only.
    fn guarded(kind: SignalKind, key: &Key, run: impl FnOnce()) {
        if catch_unwind(AssertUnwindSafe(run)).is_err() {
            log!("error"; "{} handler for `{}` panicked", kind, key);
        }
    }
}

impl fmt::Debug for LifecycleBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleBus")
            .field("keys", &self.subscribers.read().len())
            .field("observers", &self.observers.read().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
